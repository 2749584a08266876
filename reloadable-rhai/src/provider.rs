//! Rhai-backed [`ImplementationProvider`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rhai::{Dynamic, Engine, Map, Scope};

use reloadable_core::error::source_invalid;
use reloadable_core::{read_source, ImplementationProvider, ReloadError, UnitName};

use crate::engine::{build_engine, ScriptEngineConfig};
use crate::script::{ScriptClass, ScriptFunction, ScriptUnit};

/// Compiles a script file and extracts one named member from it.
///
/// A script function with the unit's name wins. Otherwise the script's
/// top level is run and a variable or constant with that name must hold an
/// object map, which becomes a class.
#[derive(Clone)]
pub struct RhaiProvider {
    engine: Arc<Engine>,
}

impl RhaiProvider {
    pub fn new(config: &ScriptEngineConfig) -> Self {
        Self::with_engine(build_engine(config))
    }

    /// Use a caller-configured engine, e.g. one with extra registered
    /// functions.
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }
}

impl Default for RhaiProvider {
    fn default() -> Self {
        Self::new(&ScriptEngineConfig::default())
    }
}

impl fmt::Debug for RhaiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RhaiProvider").finish_non_exhaustive()
    }
}

impl ImplementationProvider<ScriptUnit> for RhaiProvider {
    fn provide(&self, path: &Path, name: &UnitName) -> Result<ScriptUnit, ReloadError> {
        let source = read_source(path)?;
        let ast = self
            .engine
            .compile(&source)
            .map_err(|e| source_invalid(path, e.to_string()))?;
        let ast = Arc::new(ast);

        if ast.iter_functions().any(|f| f.name == name.as_str()) {
            return Ok(ScriptUnit::Function(ScriptFunction::new(
                Arc::clone(&self.engine),
                ast,
                name.clone(),
            )));
        }

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| source_invalid(path, e.to_string()))?;
        let members = scope
            .get_value::<Dynamic>(name.as_str())
            .and_then(|value| value.try_cast::<Map>())
            .ok_or_else(|| ReloadError::MemberMissing {
                name: name.clone(),
                path: path.to_path_buf(),
            })?;
        Ok(ScriptUnit::Class(ScriptClass::new(
            Arc::clone(&self.engine),
            ast,
            name.clone(),
            members,
        )))
    }
}
