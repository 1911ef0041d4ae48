//! Configuration module for tunnel-worker
//!
//! # Example
//!
//! ```no_run
//! use tunnel_worker::config::load_config;
//!
//! let config = load_config("/etc/tunnel-worker/worker.json").unwrap();
//! println!("Poll timeout: {:?}", config.control.poll_timeout());
//! ```

mod loader;
mod types;

pub use loader::{create_default_config, load_config, load_config_str, load_config_with_env};
pub use types::{ControlConfig, LogConfig, NetworkConfig, WorkerConfig};
