//! TOML loading for `OrchestratorConfig`.
//!
//! Every section and field is optional; omitted values take their defaults.
//! The loaded configuration is validated before it is returned, so a caller
//! never holds a config the orchestrator would refuse.

use std::path::Path;

use tracing::debug;

use attesta_contracts::{
    config::OrchestratorConfig,
    error::{AttestaError, AttestaResult},
};

/// Parse `s` as TOML and validate the resulting configuration.
///
/// Returns `AttestaError::Configuration` if the TOML is malformed, does not
/// match the `OrchestratorConfig` schema, or fails validation.
pub fn load_config_str(s: &str) -> AttestaResult<OrchestratorConfig> {
    let config: OrchestratorConfig = toml::from_str(s).map_err(|e| AttestaError::Configuration {
        reason: format!("failed to parse orchestrator TOML: {}", e),
    })?;
    config.validate()?;
    debug!(
        engine_timeout_ms = config.collector.engine_timeout_ms,
        retry_budget = config.collector.retry_budget,
        verified = config.aggregation.thresholds.verified,
        review = config.aggregation.thresholds.review,
        "orchestrator configuration loaded"
    );
    Ok(config)
}

/// Read the file at `path` and load it with `load_config_str`.
pub fn load_config_file(path: &Path) -> AttestaResult<OrchestratorConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| AttestaError::Configuration {
        reason: format!("failed to read config file '{}': {}", path.display(), e),
    })?;
    load_config_str(&contents)
}
