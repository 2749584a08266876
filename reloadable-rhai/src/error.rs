//! Error types for reloadable-rhai.

use rhai::EvalAltResult;
use thiserror::Error;

use reloadable_core::{ReloadError, UnitName};
use reloadable_runtime::RuntimeError;

/// Failures when calling into script code or wiring a script unit up.
///
/// Reload failures never show up here at call time: a failed reload leaves
/// the previous implementation callable.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script raised an error or hit an engine limit.
    #[error("script call `{name}` failed: {source}")]
    Call {
        name: String,
        #[source]
        source: Box<EvalAltResult>,
    },

    #[error("unit `{0}` is not a function")]
    NotAFunction(UnitName),

    #[error("unit `{0}` is not a class")]
    NotAClass(UnitName),

    #[error("class `{class}` has no method `{method}`")]
    MethodMissing { class: UnitName, method: String },

    #[error("instance of `{class}` no longer holds a map; cannot set `{field}`")]
    StateNotAMap { class: UnitName, field: String },

    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub(crate) fn call_err(name: impl Into<String>, source: Box<EvalAltResult>) -> ScriptError {
    ScriptError::Call {
        name: name.into(),
        source,
    }
}
