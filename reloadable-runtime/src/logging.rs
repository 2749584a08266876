//! Subscriber setup for binaries and tests embedding the reload engine.
//!
//! All three functions use `try_init`, so calling them more than once (or
//! after the host installed its own subscriber) is harmless.

use tracing_subscriber::{fmt, EnvFilter};

/// Human-readable logs filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Human-readable logs with an explicit filter directive such as
/// `"reloadable_runtime=debug"`.
pub fn init_tracing_with(directive: &str) {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_target(false)
        .try_init();
}

/// One JSON object per event, for hosts that ship logs to a collector.
pub fn init_json_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().json().with_env_filter(filter).try_init();
}
