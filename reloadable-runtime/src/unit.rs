//! The reloadable unit: a stable handle whose implementation is swapped in
//! place from source.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::Handle;

use reloadable_core::{
    ImplementationProvider, ReloadConfig, ReloadError, ReloadInterval, ReloadTrigger,
    UnitImplementation, UnitKind, UnitName,
};

use crate::builder::ReloadableBuilder;
use crate::error::{invalid_configuration, RuntimeError};
use crate::handler::{invoke_handler, ReloadHandler};
use crate::manager::ReloadableManager;
use crate::task::{TaskControl, TaskKind};
use crate::timer::spawn_reload_timer;
use crate::watcher::spawn_source_watcher;

#[derive(Debug, Default)]
struct ReloadStats {
    reloads: u64,
    failures: u64,
    last_reloaded_at: Option<DateTime<Utc>>,
    last_trigger: Option<ReloadTrigger>,
    last_error: Option<String>,
}

/// Point-in-time view of a unit, suitable for logging or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct UnitStatus {
    pub name: UnitName,
    pub kind: UnitKind,
    pub path: PathBuf,
    pub generation: u64,
    pub reloads: u64,
    pub failures: u64,
    pub last_reloaded_at: Option<DateTime<Utc>>,
    pub last_trigger: Option<ReloadTrigger>,
    pub last_error: Option<String>,
    pub watching: bool,
    pub periodic: bool,
}

pub(crate) struct UnitParts<T> {
    pub name: UnitName,
    pub initial: T,
    pub source: PathBuf,
    pub provider: Arc<dyn ImplementationProvider<T>>,
    pub handler: Option<Arc<dyn ReloadHandler<T>>>,
    pub manager: Arc<ReloadableManager>,
    pub config: ReloadConfig,
    pub runtime: Option<Handle>,
}

/// A named function or class whose implementation is recomputed from its
/// source file on demand, on file change or on a fixed interval.
///
/// The `Arc<Reloadable<T>>` is the unit's identity: every clone keeps
/// addressing the same unit across reloads, and [`Reloadable::current`]
/// always returns the implementation bound by the last successful reload.
///
/// At most one reload of a unit runs at a time. Reload handlers run inside
/// that exclusive section and must not call [`Reloadable::reload`] on the
/// unit they observe.
pub struct Reloadable<T> {
    name: UnitName,
    kind: UnitKind,
    provider: Arc<dyn ImplementationProvider<T>>,
    current: ArcSwap<T>,
    source: RwLock<PathBuf>,
    handler: RwLock<Option<Arc<dyn ReloadHandler<T>>>>,
    reload_lock: Mutex<()>,
    stats: Mutex<ReloadStats>,
    generation: AtomicU64,
    watcher: Mutex<Option<Arc<TaskControl>>>,
    timer: Mutex<Option<Arc<TaskControl>>>,
    manager: Arc<ReloadableManager>,
    config: ReloadConfig,
    runtime: Option<Handle>,
    self_ref: Weak<Self>,
}

impl<T: UnitImplementation> Reloadable<T> {
    /// Wrap an existing implementation. Reloads read from `source`.
    ///
    /// Background tasks use the tokio runtime current at construction, if
    /// any, and otherwise the one current when they are started.
    pub fn new(
        name: impl Into<UnitName>,
        initial: T,
        source: impl Into<PathBuf>,
        provider: impl ImplementationProvider<T> + 'static,
    ) -> Arc<Self> {
        Self::assemble(UnitParts {
            name: name.into(),
            initial,
            source: source.into(),
            provider: Arc::new(provider),
            handler: None,
            manager: ReloadableManager::global(),
            config: ReloadConfig::default(),
            runtime: Handle::try_current().ok(),
        })
    }

    /// Load the initial implementation of `name` from `source`.
    pub fn load(
        name: impl Into<UnitName>,
        source: impl Into<PathBuf>,
        provider: impl ImplementationProvider<T> + 'static,
    ) -> Result<Arc<Self>, ReloadError> {
        let name = name.into();
        let source = source.into();
        let initial = provider.provide(&source, &name)?;
        Ok(Self::new(name, initial, source, provider))
    }

    pub fn builder(
        name: impl Into<UnitName>,
        provider: impl ImplementationProvider<T> + 'static,
    ) -> ReloadableBuilder<T> {
        ReloadableBuilder::new(name.into(), Arc::new(provider))
    }

    pub(crate) fn assemble(parts: UnitParts<T>) -> Arc<Self> {
        let kind = parts.initial.kind();
        Arc::new_cyclic(|self_ref| Self {
            name: parts.name,
            kind,
            provider: parts.provider,
            current: ArcSwap::from_pointee(parts.initial),
            source: RwLock::new(parts.source),
            handler: RwLock::new(parts.handler),
            reload_lock: Mutex::new(()),
            stats: Mutex::new(ReloadStats::default()),
            generation: AtomicU64::new(0),
            watcher: Mutex::new(None),
            timer: Mutex::new(None),
            manager: parts.manager,
            config: parts.config,
            runtime: parts.runtime,
            self_ref: self_ref.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Reloading
    // -----------------------------------------------------------------------

    /// Recompute the implementation from the current source location.
    ///
    /// Blocks while another reload of this unit is in progress. On success
    /// the new implementation is live before the handler runs and the new
    /// generation is returned. On failure the previous implementation stays
    /// live, the handler is not called and the error has already been logged.
    pub fn reload(&self) -> Result<u64, ReloadError> {
        let _guard = self.reload_lock.lock();
        self.reload_locked(ReloadTrigger::Manual)
    }

    /// [`Reloadable::reload`] on the blocking pool.
    pub async fn reload_async(self: &Arc<Self>) -> Result<u64, RuntimeError> {
        let unit = Arc::clone(self);
        let outcome = tokio::task::spawn_blocking(move || unit.reload())
            .await
            .map_err(|e| RuntimeError::TaskJoin(e.to_string()))?;
        Ok(outcome?)
    }

    /// Reload requested by a background task. Skipped when the task was
    /// stopped while waiting for the lock.
    pub(crate) fn reload_from(&self, trigger: ReloadTrigger, control: &TaskControl) {
        let _guard = self.reload_lock.lock();
        if !control.is_running() {
            tracing::debug!(unit = %self.name, trigger = %trigger, "task stopped; skipping reload");
            return;
        }
        // Already logged; background triggers have no caller to report to.
        let _ = self.reload_locked(trigger);
    }

    fn reload_locked(&self, trigger: ReloadTrigger) -> Result<u64, ReloadError> {
        let path = self.file_path();
        match self.compute(&path) {
            Ok(next) => {
                self.current.store(Arc::new(next));
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                {
                    let mut stats = self.stats.lock();
                    stats.reloads += 1;
                    stats.last_reloaded_at = Some(Utc::now());
                    stats.last_trigger = Some(trigger);
                }
                tracing::info!(
                    unit = %self.name,
                    unit_kind = %self.kind,
                    path = %path.display(),
                    trigger = %trigger,
                    generation,
                    "code reloaded",
                );
                let handler = self.handler.read().clone();
                if let Some(handler) = handler {
                    invoke_handler(handler.as_ref(), self);
                }
                Ok(generation)
            }
            Err(err) => {
                {
                    let mut stats = self.stats.lock();
                    stats.failures += 1;
                    stats.last_error = Some(err.to_string());
                }
                tracing::warn!(
                    unit = %self.name,
                    path = %path.display(),
                    trigger = %trigger,
                    kind = err.kind_label(),
                    error = %err,
                    "reload failed; keeping previous implementation",
                );
                Err(err)
            }
        }
    }

    fn compute(&self, path: &Path) -> Result<T, ReloadError> {
        let next = self.provider.provide(path, &self.name)?;
        let found = next.kind();
        if found != self.kind {
            return Err(ReloadError::KindMismatch {
                name: self.name.clone(),
                expected: self.kind,
                found,
            });
        }
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Replace the reload handler. Takes effect from the next reload.
    pub fn set_handler(&self, handler: impl ReloadHandler<T> + 'static) {
        *self.handler.write() = Some(Arc::new(handler));
    }

    pub fn clear_handler(&self) {
        *self.handler.write() = None;
    }

    /// Point the unit at a new source file.
    ///
    /// A running watcher is restarted on the new path. If that restart fails
    /// the unit is left without a watcher and the error is returned.
    pub fn set_file_path(&self, path: impl Into<PathBuf>) -> Result<(), RuntimeError> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(invalid_configuration("source path must not be empty"));
        }
        let mut slot = self.watcher.lock();
        *self.source.write() = path;
        tracing::info!(unit = %self.name, path = %self.file_path().display(), "source path changed");
        let watching = slot.as_ref().is_some_and(|task| task.is_running());
        if watching {
            self.replace_watcher(&mut slot)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Background tasks
    // -----------------------------------------------------------------------

    /// Reload whenever the source file changes. Replaces a running watcher.
    pub fn start_on_modified_update(&self) -> Result<(), RuntimeError> {
        let mut slot = self.watcher.lock();
        self.replace_watcher(&mut slot)
    }

    /// Returns `true` if a watcher was running.
    pub fn stop_on_modified_update(&self) -> bool {
        let retired = self.watcher.lock().take();
        retired.is_some_and(|task| self.retire(&task))
    }

    /// Reload every `interval`. Replaces a running timer.
    ///
    /// A zero interval, or one above [`ReloadInterval::MAX`], fails with
    /// `InvalidConfiguration` and leaves any running timer untouched.
    pub fn start_periodic_update(&self, interval: Duration) -> Result<(), RuntimeError> {
        let interval = ReloadInterval::new(interval)?;
        self.start_timer(interval)
    }

    /// [`Reloadable::start_periodic_update`] with the configured default interval.
    pub fn start_periodic_update_default(&self) -> Result<(), RuntimeError> {
        let interval = self.config.default_interval()?;
        self.start_timer(interval)
    }

    /// Returns `true` if a timer was running.
    pub fn stop_periodic_update(&self) -> bool {
        let retired = self.timer.lock().take();
        retired.is_some_and(|task| self.retire(&task))
    }

    fn replace_watcher(&self, slot: &mut Option<Arc<TaskControl>>) -> Result<(), RuntimeError> {
        let runtime = self.runtime_handle()?;
        if let Some(old) = slot.take() {
            self.retire(&old);
        }
        let control = TaskControl::new(TaskKind::Watcher, self.name.clone());
        spawn_source_watcher(
            &runtime,
            self.self_ref.clone(),
            &self.file_path(),
            self.config.debounce(),
            Arc::clone(&control),
        )?;
        self.manager.register(Arc::clone(&control));
        *slot = Some(control);
        Ok(())
    }

    pub(crate) fn start_timer(&self, interval: ReloadInterval) -> Result<(), RuntimeError> {
        let runtime = self.runtime_handle()?;
        let mut slot = self.timer.lock();
        if let Some(old) = slot.take() {
            self.retire(&old);
        }
        let control = TaskControl::new(TaskKind::Timer, self.name.clone());
        spawn_reload_timer(
            &runtime,
            self.self_ref.clone(),
            interval,
            self.config.reload_on_start,
            Arc::clone(&control),
        );
        self.manager.register(Arc::clone(&control));
        *slot = Some(control);
        Ok(())
    }

    fn retire(&self, task: &TaskControl) -> bool {
        let was_running = task.stop();
        self.manager.deregister(task);
        was_running
    }

    fn runtime_handle(&self) -> Result<Handle, RuntimeError> {
        self.runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or(RuntimeError::NoAsyncRuntime)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &UnitName {
        &self.name
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Snapshot of the live implementation. Never blocks on a reload.
    pub fn current(&self) -> Arc<T> {
        self.current.load_full()
    }

    pub fn file_path(&self) -> PathBuf {
        self.source.read().clone()
    }

    /// Number of successful reloads since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// What caused the last successful reload.
    pub fn last_trigger(&self) -> Option<ReloadTrigger> {
        self.stats.lock().last_trigger
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().as_ref().is_some_and(|task| task.is_running())
    }

    pub fn is_updating_periodically(&self) -> bool {
        self.timer.lock().as_ref().is_some_and(|task| task.is_running())
    }

    pub fn config(&self) -> &ReloadConfig {
        &self.config
    }

    pub fn status(&self) -> UnitStatus {
        let stats = self.stats.lock();
        UnitStatus {
            name: self.name.clone(),
            kind: self.kind,
            path: self.file_path(),
            generation: self.generation(),
            reloads: stats.reloads,
            failures: stats.failures,
            last_reloaded_at: stats.last_reloaded_at,
            last_trigger: stats.last_trigger,
            last_error: stats.last_error.clone(),
            watching: self.is_watching(),
            periodic: self.is_updating_periodically(),
        }
    }
}

impl<T> Drop for Reloadable<T> {
    fn drop(&mut self) {
        for slot in [self.watcher.get_mut(), self.timer.get_mut()] {
            if let Some(task) = slot.take() {
                task.stop();
                self.manager.deregister(&task);
            }
        }
    }
}

impl<T> fmt::Debug for Reloadable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reloadable")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("source", &*self.source.read())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Fixed(UnitKind);

    impl UnitImplementation for Fixed {
        fn kind(&self) -> UnitKind {
            self.0
        }
    }

    fn function_provider(_: &Path, _: &UnitName) -> Result<Fixed, ReloadError> {
        Ok(Fixed(UnitKind::Function))
    }

    fn class_provider(_: &Path, _: &UnitName) -> Result<Fixed, ReloadError> {
        Ok(Fixed(UnitKind::Class))
    }

    #[test]
    fn kind_is_fixed_by_the_initial_implementation() {
        let unit = Reloadable::new("f", Fixed(UnitKind::Function), "f.src", class_provider);
        let err = unit.reload().unwrap_err();
        assert!(
            matches!(err, ReloadError::KindMismatch { expected: UnitKind::Function, found: UnitKind::Class, .. }),
            "got: {err}"
        );
        assert_eq!(unit.generation(), 0);
        assert_eq!(unit.status().failures, 1);
    }

    #[test]
    fn handler_sees_new_generation() {
        let unit = Reloadable::new("f", Fixed(UnitKind::Function), "f.src", function_provider);
        let seen = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&seen);
        unit.set_handler(move |target: &Reloadable<Fixed>| -> crate::HandlerResult {
            observed.store(target.generation() as usize, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(unit.reload().expect("reload"), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        unit.clear_handler();
        assert_eq!(unit.reload().expect("reload"), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_source_path_is_rejected() {
        let unit = Reloadable::new("f", Fixed(UnitKind::Function), "f.src", function_provider);
        let err = unit.set_file_path("").unwrap_err();
        assert!(err.is_invalid_configuration(), "got: {err}");
        assert_eq!(unit.file_path(), PathBuf::from("f.src"));
    }

    #[test]
    fn starting_tasks_without_a_runtime_fails() {
        let unit = Reloadable::new("f", Fixed(UnitKind::Function), "f.src", function_provider);
        assert!(matches!(
            unit.start_periodic_update(Duration::from_secs(1)),
            Err(RuntimeError::NoAsyncRuntime)
        ));
        assert!(matches!(
            unit.start_on_modified_update(),
            Err(RuntimeError::NoAsyncRuntime)
        ));
        assert!(!unit.is_updating_periodically());
        assert!(!unit.is_watching());
    }

    #[test]
    fn zero_interval_is_checked_before_the_runtime() {
        let unit = Reloadable::new("f", Fixed(UnitKind::Function), "f.src", function_provider);
        let err = unit.start_periodic_update(Duration::ZERO).unwrap_err();
        assert!(err.is_invalid_configuration(), "got: {err}");
    }

    #[test]
    fn stopping_without_tasks_is_a_no_op() {
        let unit = Reloadable::new("f", Fixed(UnitKind::Function), "f.src", function_provider);
        assert!(!unit.stop_on_modified_update());
        assert!(!unit.stop_periodic_update());
    }
}
