//! Domain types shared by every reloadable crate.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReloadError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of the member a unit looks up in its source on every reload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitName(pub String);

impl UnitName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for UnitName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UnitName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strictly positive period between two timer-driven reloads, at most
/// [`ReloadInterval::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReloadInterval(Duration);

impl ReloadInterval {
    /// Longest accepted period. Timer deadlines are computed as `now + period`
    /// and must stay representable as an `Instant`.
    pub const MAX: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Rejects a zero duration, or one longer than [`ReloadInterval::MAX`],
    /// with [`ReloadError::InvalidConfiguration`].
    pub fn new(period: Duration) -> Result<Self, ReloadError> {
        if period.is_zero() {
            return Err(ReloadError::InvalidConfiguration(
                "reload interval must be a positive duration".to_string(),
            ));
        }
        if period > Self::MAX {
            return Err(ReloadError::InvalidConfiguration(format!(
                "reload interval {}s exceeds the maximum of {}s",
                period.as_secs(),
                Self::MAX.as_secs()
            )));
        }
        Ok(Self(period))
    }

    /// Builds an interval from fractional seconds, rejecting zero, negative,
    /// non-finite and out-of-range values.
    pub fn from_secs_f64(secs: f64) -> Result<Self, ReloadError> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ReloadError::InvalidConfiguration(format!(
                "reload interval must be a positive number of seconds, got {secs}"
            )));
        }
        let period = Duration::try_from_secs_f64(secs).map_err(|e| {
            ReloadError::InvalidConfiguration(format!("reload interval of {secs}s: {e}"))
        })?;
        Self::new(period)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl TryFrom<Duration> for ReloadInterval {
    type Error = ReloadError;

    fn try_from(period: Duration) -> Result<Self, Self::Error> {
        Self::new(period)
    }
}

impl fmt::Display for ReloadInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Structural kind of a reloadable unit. Fixed for the lifetime of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Function,
    Class,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Function => write!(f, "function"),
            UnitKind::Class => write!(f, "class"),
        }
    }
}

/// What asked for a reload. Only used for logging and status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadTrigger {
    Manual,
    Watcher,
    Timer,
}

impl fmt::Display for ReloadTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadTrigger::Manual => write!(f, "manual"),
            ReloadTrigger::Watcher => write!(f, "watcher"),
            ReloadTrigger::Timer => write!(f, "timer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0)]
    #[case(-1.5)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(1e300)]
    #[case(4e7)]
    fn interval_rejects_non_positive_seconds(#[case] secs: f64) {
        let err = ReloadInterval::from_secs_f64(secs).unwrap_err();
        assert!(matches!(err, ReloadError::InvalidConfiguration(_)), "got: {err}");
    }

    #[test]
    fn interval_rejects_zero_duration() {
        assert!(ReloadInterval::new(Duration::ZERO).is_err());
        assert!(ReloadInterval::try_from(Duration::ZERO).is_err());
    }

    #[test]
    fn interval_rejects_periods_past_the_maximum() {
        assert!(ReloadInterval::new(ReloadInterval::MAX).is_ok());
        let err = ReloadInterval::new(Duration::MAX).unwrap_err();
        assert!(matches!(err, ReloadError::InvalidConfiguration(_)), "got: {err}");
        assert!(ReloadInterval::new(ReloadInterval::MAX + Duration::from_millis(1)).is_err());
    }

    #[test]
    fn interval_keeps_positive_duration() {
        let interval = ReloadInterval::from_secs_f64(0.25).expect("positive interval");
        assert_eq!(interval.as_duration(), Duration::from_millis(250));
        assert_eq!(interval.to_string(), "250ms");
    }

    #[test]
    fn kinds_and_triggers_display_lowercase() {
        assert_eq!(UnitKind::Function.to_string(), "function");
        assert_eq!(UnitKind::Class.to_string(), "class");
        assert_eq!(ReloadTrigger::Watcher.to_string(), "watcher");
        assert_eq!(UnitName::from("area").to_string(), "area");
    }
}
