use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use reloadable_core::{
    ImplementationProvider, ReloadConfig, ReloadInterval, UnitImplementation, UnitName,
};

use crate::error::{invalid_configuration, RuntimeError};
use crate::handler::ReloadHandler;
use crate::manager::ReloadableManager;
use crate::unit::{Reloadable, UnitParts};

enum Periodic {
    Every(Duration),
    Default,
}

/// Configures a [`Reloadable`] and optionally starts its watcher and timer.
///
/// ```rust,no_run
/// # use std::time::Duration;
/// # use reloadable_runtime::{Reloadable, RuntimeError};
/// # use reloadable_core::{ReloadError, UnitImplementation, UnitKind, UnitName};
/// # struct Noop;
/// # impl UnitImplementation for Noop { fn kind(&self) -> UnitKind { UnitKind::Function } }
/// # fn provide(_: &std::path::Path, _: &UnitName) -> Result<Noop, ReloadError> { Ok(Noop) }
/// # async fn demo() -> Result<(), RuntimeError> {
/// let unit = Reloadable::builder("area", provide)
///     .source("shapes/area.rhai")
///     .watch()
///     .periodic(Duration::from_secs(30))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ReloadableBuilder<T> {
    name: UnitName,
    provider: Arc<dyn ImplementationProvider<T>>,
    source: Option<PathBuf>,
    initial: Option<T>,
    handler: Option<Arc<dyn ReloadHandler<T>>>,
    config: ReloadConfig,
    manager: Option<Arc<ReloadableManager>>,
    runtime: Option<Handle>,
    watch: bool,
    periodic: Option<Periodic>,
}

impl<T: UnitImplementation> ReloadableBuilder<T> {
    pub(crate) fn new(name: UnitName, provider: Arc<dyn ImplementationProvider<T>>) -> Self {
        Self {
            name,
            provider,
            source: None,
            initial: None,
            handler: None,
            config: ReloadConfig::default(),
            manager: None,
            runtime: None,
            watch: false,
            periodic: None,
        }
    }

    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Start from an existing implementation instead of loading one.
    pub fn implementation(mut self, initial: T) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn handler(mut self, handler: impl ReloadHandler<T> + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn config(mut self, config: ReloadConfig) -> Self {
        self.config = config;
        self
    }

    /// Register background tasks with `manager` instead of the global one.
    pub fn manager(mut self, manager: Arc<ReloadableManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Start a source watcher once built.
    pub fn watch(mut self) -> Self {
        self.watch = true;
        self
    }

    /// Start a reload timer once built.
    pub fn periodic(mut self, interval: Duration) -> Self {
        self.periodic = Some(Periodic::Every(interval));
        self
    }

    /// Start a reload timer with the configured default interval once built.
    pub fn periodic_default(mut self) -> Self {
        self.periodic = Some(Periodic::Default);
        self
    }

    /// Validate everything, load the initial implementation if none was
    /// given, then start the requested background tasks.
    pub fn build(self) -> Result<Arc<Reloadable<T>>, RuntimeError> {
        let source = match self.source {
            Some(path) if !path.as_os_str().is_empty() => path,
            Some(_) => return Err(invalid_configuration("source path must not be empty")),
            None => {
                return Err(invalid_configuration(format!(
                    "no source path given for unit `{}`",
                    self.name
                )))
            }
        };
        self.config.validate()?;
        let interval: Option<ReloadInterval> = match self.periodic {
            Some(Periodic::Every(period)) => Some(ReloadInterval::new(period)?),
            Some(Periodic::Default) => Some(self.config.default_interval()?),
            None => None,
        };
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        if (self.watch || interval.is_some()) && runtime.is_none() {
            return Err(RuntimeError::NoAsyncRuntime);
        }

        let initial = match self.initial {
            Some(initial) => initial,
            None => self.provider.provide(&source, &self.name)?,
        };
        let unit = Reloadable::assemble(UnitParts {
            name: self.name,
            initial,
            source,
            provider: self.provider,
            handler: self.handler,
            manager: self.manager.unwrap_or_else(ReloadableManager::global),
            config: self.config,
            runtime,
        });

        if self.watch {
            unit.start_on_modified_update()?;
        }
        if let Some(interval) = interval {
            unit.start_timer(interval)?;
        }
        Ok(unit)
    }
}
