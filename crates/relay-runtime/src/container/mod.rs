//! # Runtime Container
//!
//! Configuration for the daemon.

pub mod config;

pub use config::{ConfigError, LimitsConfig, NetworkConfig, PathsConfig, RelayConfig};
