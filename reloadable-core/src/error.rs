//! Error types for reloadable-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{UnitKind, UnitName};

/// All errors that can arise while configuring or reloading a unit.
///
/// The first four variants are reload-time failures: they are logged at the
/// unit boundary and leave the live implementation untouched. Only
/// [`ReloadError::InvalidConfiguration`] is meant to reach the caller of a
/// configuring operation.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The source file is missing or unreadable.
    #[error("source unavailable at {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source was read but could not be parsed or evaluated.
    #[error("invalid source at {path}: {reason}")]
    SourceInvalid { path: PathBuf, reason: String },

    /// The reloaded source no longer defines the unit's member.
    #[error("member `{name}` not found in {path}")]
    MemberMissing { name: UnitName, path: PathBuf },

    /// The member exists but changed kind (function ↔ class).
    #[error("member `{name}` was a {expected} but is now a {found}")]
    KindMismatch {
        name: UnitName,
        expected: UnitKind,
        found: UnitKind,
    },

    /// Non-positive interval, malformed path, or unusable configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ReloadError {
    /// Stable snake_case label used as the `kind` field in log events.
    pub fn kind_label(&self) -> &'static str {
        match self {
            ReloadError::SourceUnavailable { .. } => "source_unavailable",
            ReloadError::SourceInvalid { .. } => "source_invalid",
            ReloadError::MemberMissing { .. } => "member_missing",
            ReloadError::KindMismatch { .. } => "kind_mismatch",
            ReloadError::InvalidConfiguration(_) => "invalid_configuration",
        }
    }

    /// `true` for failures that can only happen while recomputing an
    /// implementation from source.
    pub fn is_reload_time(&self) -> bool {
        !matches!(self, ReloadError::InvalidConfiguration(_))
    }
}

/// Convenience constructor for [`ReloadError::SourceUnavailable`].
pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> ReloadError {
    ReloadError::SourceUnavailable {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`ReloadError::SourceInvalid`].
pub fn source_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> ReloadError {
    ReloadError::SourceInvalid {
        path: path.into(),
        reason: reason.into(),
    }
}
