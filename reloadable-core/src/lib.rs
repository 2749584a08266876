//! Reloadable core library: domain types, provider traits, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: unit names, unit kinds, validated reload intervals
//! - [`error`]: [`ReloadError`]
//! - [`provider`]: [`ImplementationProvider`] and [`UnitImplementation`]
//! - [`config`]: [`ReloadConfig`] (YAML)

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::ReloadConfig;
pub use error::ReloadError;
pub use provider::{read_source, ImplementationProvider, UnitImplementation};
pub use types::{ReloadInterval, ReloadTrigger, UnitKind, UnitName};
