use thiserror::Error;

use reloadable_core::ReloadError;

/// Error surface for unit configuration and background task management.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("no tokio runtime available to run background reload tasks")]
    NoAsyncRuntime,

    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl RuntimeError {
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, RuntimeError::Reload(ReloadError::InvalidConfiguration(_)))
    }
}

pub(crate) fn invalid_configuration(message: impl Into<String>) -> RuntimeError {
    RuntimeError::Reload(ReloadError::InvalidConfiguration(message.into()))
}
