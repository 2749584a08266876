//! Shared Rhai engine construction.

use rhai::Engine;
use serde::{Deserialize, Serialize};

/// Resource limits applied to every script evaluation. Zero disables a limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptEngineConfig {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for ScriptEngineConfig {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_call_levels: 64,
            max_string_size: 1_000_000,
            max_array_size: 10_000,
            max_map_size: 10_000,
        }
    }
}

/// Build an engine with `config`'s limits. Script `print` and `debug` output
/// goes to `tracing`.
pub fn build_engine(config: &ScriptEngineConfig) -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(config.max_operations);
    engine.set_max_call_levels(config.max_call_levels);
    engine.set_max_string_size(config.max_string_size);
    engine.set_max_array_size(config.max_array_size);
    engine.set_max_map_size(config.max_map_size);

    engine.on_print(|text| tracing::info!(script_output = text, "script print"));
    engine.on_debug(|text, source, pos| {
        tracing::debug!(
            script_output = text,
            source = source.unwrap_or("<script>"),
            position = %pos,
            "script debug",
        );
    });
    engine
}
