//! Configuration types for tunnel-worker
//!
//! The worker reads a small JSON document at startup. Every section has
//! defaults so an empty object `{}` is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound accepted for the trial-decrypt record buffer
const MAX_RECORD_BUFFER_SIZE: usize = 64 * 1024;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Control channel behavior
    #[serde(default)]
    pub control: ControlConfig,

    /// Tunnel device settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl WorkerConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.validate()?;
        self.network.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

/// Control channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    /// How long one wait on the control channel may block before looping
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Size of the buffer a trial-decrypt record is read into
    #[serde(default = "default_record_buffer_size")]
    pub record_buffer_size: usize,

    /// Expect a UDP (DTLS) descriptor from the main process
    #[serde(default = "default_true")]
    pub udp_enabled: bool,
}

impl ControlConfig {
    /// Validate control configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "poll_timeout_ms must be greater than 0",
            ));
        }

        if self.record_buffer_size == 0 || self.record_buffer_size > MAX_RECORD_BUFFER_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "record_buffer_size must be between 1 and {MAX_RECORD_BUFFER_SIZE}"
            )));
        }

        Ok(())
    }

    /// Poll timeout as a `Duration`
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
            record_buffer_size: default_record_buffer_size(),
            udp_enabled: true,
        }
    }
}

/// Tunnel device configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Fixed tunnel MTU; 0 means discover it from the interface
    #[serde(default)]
    pub mtu: u32,
}

impl NetworkConfig {
    /// Validate network configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // IPv4 minimum reassembly size
        if self.mtu != 0 && self.mtu < 576 {
            return Err(ConfigError::ValidationError(format!(
                "mtu {} is below the IPv4 minimum of 576",
                self.mtu
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include target (module path)
    #[serde(default = "default_true")]
    pub target: bool,
}

impl LogConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown log format '{other}' (expected json or text)"
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_poll_timeout_ms() -> u64 {
    1000
}

const fn default_record_buffer_size() -> usize {
    16 * 1024
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}
