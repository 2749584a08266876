//! Reload engine configuration, loaded from YAML.
//!
//! ```yaml
//! debounce_ms: 50
//! default_interval_ms: 1000
//! reload_on_start: false
//! ```
//!
//! Every key is optional; unknown keys are rejected so typos surface early.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReloadError;
use crate::types::ReloadInterval;

pub const DEFAULT_DEBOUNCE_MS: u64 = 50;
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Tunables shared by every unit built with this configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReloadConfig {
    /// Settle window between a change notification and the reload it
    /// triggers. Notifications inside the window collapse into one reload.
    pub debounce_ms: u64,
    /// Interval used by `start_periodic_update_default`.
    pub default_interval_ms: u64,
    /// Reload once immediately when a timer starts instead of waiting a full
    /// interval for the first tick.
    pub reload_on_start: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            default_interval_ms: DEFAULT_INTERVAL_MS,
            reload_on_start: false,
        }
    }
}

impl ReloadConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ReloadError> {
        let config: ReloadConfig = serde_yaml::from_str(text).map_err(|e| {
            ReloadError::InvalidConfiguration(format!("malformed reload configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the YAML file at `path`.
    ///
    /// Unreadable files and malformed YAML are both
    /// [`ReloadError::InvalidConfiguration`], with the path in the message.
    pub fn load_at(path: &Path) -> Result<Self, ReloadError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReloadError::InvalidConfiguration(format!(
                "cannot read reload configuration at {}: {e}",
                path.display()
            ))
        })?;
        let config: ReloadConfig = serde_yaml::from_str(&contents).map_err(|e| {
            ReloadError::InvalidConfiguration(format!(
                "failed to parse reload configuration at {}: {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReloadError> {
        if self.default_interval_ms == 0 {
            return Err(ReloadError::InvalidConfiguration(
                "default_interval_ms must be greater than zero".to_string(),
            ));
        }
        self.default_interval().map(|_| ())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn default_interval(&self) -> Result<ReloadInterval, ReloadError> {
        ReloadInterval::new(Duration::from_millis(self.default_interval_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ReloadConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(
            config.default_interval().expect("interval").as_duration(),
            Duration::from_secs(1)
        );
        assert!(!config.reload_on_start);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config = ReloadConfig::from_yaml_str("debounce_ms: 0\n").expect("parse");
        assert_eq!(config.debounce(), Duration::ZERO);
        assert_eq!(config.default_interval_ms, DEFAULT_INTERVAL_MS);
    }

    #[test]
    fn zero_default_interval_is_rejected() {
        let err = ReloadConfig::from_yaml_str("default_interval_ms: 0\n").unwrap_err();
        assert!(matches!(err, ReloadError::InvalidConfiguration(_)), "got: {err}");
    }

    #[test]
    fn oversized_default_interval_is_rejected() {
        let err = ReloadConfig::from_yaml_str("default_interval_ms: 18446744073709551615\n").unwrap_err();
        assert!(matches!(err, ReloadError::InvalidConfiguration(_)), "got: {err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ReloadConfig::from_yaml_str("debounce: 10\n").unwrap_err();
        assert!(err.to_string().contains("malformed"), "got: {err}");
    }
}
