//! Configuration loading
//!
//! This module handles loading configuration from files and environment variables.

use std::path::Path;

use tracing::debug;

use super::types::WorkerConfig;
use crate::error::ConfigError;

/// Load configuration from a JSON file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_config(path: impl AsRef<Path>) -> Result<WorkerConfig, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;

    let config: WorkerConfig = serde_json::from_str(&contents).map_err(|e| {
        ConfigError::ParseError(format!("Failed to parse JSON: {e} at {path:?}"))
    })?;

    config.validate()?;

    Ok(config)
}

/// Load configuration from a JSON string
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(json: &str) -> Result<WorkerConfig, ConfigError> {
    let config: WorkerConfig =
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.validate()?;

    Ok(config)
}

/// Load configuration with environment variable overrides
///
/// Environment variables:
/// - `TUNNEL_WORKER_LOG_LEVEL`: Override log level
/// - `TUNNEL_WORKER_MTU`: Override the tunnel MTU
/// - `TUNNEL_WORKER_POLL_TIMEOUT_MS`: Override the control channel poll timeout
///
/// A missing `path` yields the default configuration with overrides applied.
///
/// # Errors
///
/// Returns `ConfigError` if loading, parsing, or an override fails.
pub fn load_config_with_env(path: Option<&Path>) -> Result<WorkerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => WorkerConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    config.validate()?;

    Ok(config)
}

/// Apply overrides from a variable lookup
fn apply_env_overrides(
    config: &mut WorkerConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(level) = lookup("TUNNEL_WORKER_LOG_LEVEL") {
        config.log.level = level;
        debug!("Log level overridden to {}", config.log.level);
    }

    if let Some(mtu) = lookup("TUNNEL_WORKER_MTU") {
        config.network.mtu = mtu.parse().map_err(|_| ConfigError::EnvError {
            name: "TUNNEL_WORKER_MTU".into(),
            reason: format!("Invalid number: {mtu}"),
        })?;
        debug!("MTU overridden to {}", config.network.mtu);
    }

    if let Some(timeout) = lookup("TUNNEL_WORKER_POLL_TIMEOUT_MS") {
        config.control.poll_timeout_ms = timeout.parse().map_err(|_| ConfigError::EnvError {
            name: "TUNNEL_WORKER_POLL_TIMEOUT_MS".into(),
            reason: format!("Invalid number: {timeout}"),
        })?;
        debug!(
            "Poll timeout overridden to {}ms",
            config.control.poll_timeout_ms
        );
    }

    Ok(())
}

/// Create a default configuration file at the given path
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be written.
pub fn create_default_config(path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let config = WorkerConfig::default();
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {e}")))?;

    std::fs::write(path, json)?;
    Ok(())
}
