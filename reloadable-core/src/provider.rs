//! The pluggable "source location + member name → implementation" capability.
//!
//! The runtime never parses source itself. Every reload asks an
//! [`ImplementationProvider`] for a fresh value and swaps it in only when the
//! provider succeeds and the value has the same [`UnitKind`] as before.

use std::path::Path;

use crate::error::{source_unavailable, ReloadError};
use crate::types::{UnitKind, UnitName};

/// A live implementation that can be bound to a reloadable unit.
pub trait UnitImplementation: Send + Sync + 'static {
    /// Whether this value is a function or a class.
    fn kind(&self) -> UnitKind;
}

/// Produces a new implementation of `name` from the source at `path`.
///
/// Implementations must report failures through the reload-time variants of
/// [`ReloadError`]: `SourceUnavailable`, `SourceInvalid`, `MemberMissing`.
/// Kind validation is done by the caller.
pub trait ImplementationProvider<T>: Send + Sync {
    fn provide(&self, path: &Path, name: &UnitName) -> Result<T, ReloadError>;
}

impl<T, F> ImplementationProvider<T> for F
where
    F: Fn(&Path, &UnitName) -> Result<T, ReloadError> + Send + Sync,
{
    fn provide(&self, path: &Path, name: &UnitName) -> Result<T, ReloadError> {
        self(path, name)
    }
}

/// Read a UTF-8 source file, mapping any I/O failure to
/// [`ReloadError::SourceUnavailable`].
pub fn read_source(path: &Path) -> Result<String, ReloadError> {
    std::fs::read_to_string(path).map_err(|e| source_unavailable(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Constant(i64);

    impl UnitImplementation for Constant {
        fn kind(&self) -> UnitKind {
            UnitKind::Function
        }
    }

    #[test]
    fn closures_are_providers() {
        let provider = |path: &Path, name: &UnitName| -> Result<Constant, ReloadError> {
            let text = read_source(path)?;
            text.trim().parse::<i64>().map(Constant).map_err(|_| {
                ReloadError::MemberMissing {
                    name: name.clone(),
                    path: path.to_path_buf(),
                }
            })
        };

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("answer.txt");
        fs::write(&path, "42\n").expect("write");

        let value = provider
            .provide(&path, &UnitName::from("answer"))
            .expect("provide");
        assert_eq!(value.0, 42);
        assert_eq!(value.kind(), UnitKind::Function);
    }

    #[test]
    fn read_source_reports_missing_file_as_unavailable() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("missing.rhai");
        let err = read_source(&path).unwrap_err();
        assert!(matches!(err, ReloadError::SourceUnavailable { .. }), "got: {err}");
        assert!(err.to_string().contains("missing.rhai"));
    }
}
