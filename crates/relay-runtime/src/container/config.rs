//! # Relay Configuration
//!
//! Layered configuration for `deskrelayd`:
//!
//! 1. built-in defaults
//! 2. optional TOML file (`--config`)
//! 3. `DR_*` environment variables
//! 4. command-line flags
//!
//! ```toml
//! [network]
//! tcp_bind = "127.0.0.1:0"
//! enable_tcp = true
//!
//! [limits]
//! max_payload_bytes = 16777216
//! handshake_timeout_secs = 5
//!
//! [paths]
//! runtime_dir = "/run/user/1000"
//! home_dir = "/home/alice"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dr_01_wire_protocol::DEFAULT_MAX_PAYLOAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment override for [`NetworkConfig::tcp_bind`].
pub const ENV_TCP_BIND: &str = "DR_TCP_BIND";
/// Environment override for [`PathsConfig::runtime_dir`].
pub const ENV_RUNTIME_DIR: &str = "DR_RUNTIME_DIR";
/// Environment override for [`PathsConfig::home_dir`].
pub const ENV_HOME: &str = "DR_HOME";
/// Environment override for [`LimitsConfig::max_payload_bytes`].
pub const ENV_MAX_PAYLOAD: &str = "DR_MAX_PAYLOAD";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("max_payload_bytes must be non-zero")]
    ZeroPayloadLimit,
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration.
    pub network: NetworkConfig,
    /// Protocol limits.
    pub limits: LimitsConfig,
    /// Filesystem locations.
    pub paths: PathsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP listen address; port 0 picks a free port.
    pub tcp_bind: SocketAddr,
    /// Whether to open the TCP listener at all.
    pub enable_tcp: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tcp_bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            enable_tcp: true,
        }
    }
}

/// Protocol limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted frame payload.
    pub max_payload_bytes: usize,
    /// Deadline for the cookie handshake.
    pub handshake_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD,
            handshake_timeout_secs: 5,
        }
    }
}

impl LimitsConfig {
    /// Handshake deadline as a duration.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

/// Filesystem locations. Unset entries fall back to the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for the socket and cookie (`$XDG_RUNTIME_DIR`, else the temp dir).
    pub runtime_dir: Option<PathBuf>,
    /// Directory for the discovery file (`$HOME`).
    pub home_dir: Option<PathBuf>,
}

impl PathsConfig {
    /// Resolved runtime directory.
    pub fn runtime_dir(&self) -> PathBuf {
        self.runtime_dir
            .clone()
            .or_else(|| std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from))
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Resolved home directory.
    pub fn home_dir(&self) -> PathBuf {
        self.home_dir
            .clone()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl RelayConfig {
    /// Defaults, then `file` if given, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing sections keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `DR_*` overrides looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TCP_BIND) {
            self.network.tcp_bind = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_TCP_BIND,
                value,
            })?;
        }
        if let Some(value) = lookup(ENV_MAX_PAYLOAD) {
            self.limits.max_payload_bytes =
                value.parse().map_err(|_| ConfigError::InvalidEnv {
                    var: ENV_MAX_PAYLOAD,
                    value,
                })?;
        }
        if let Some(value) = lookup(ENV_RUNTIME_DIR) {
            self.paths.runtime_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_HOME) {
            self.paths.home_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// Reject settings the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_payload_bytes == 0 {
            return Err(ConfigError::ZeroPayloadLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.limits.max_payload_bytes, DEFAULT_MAX_PAYLOAD);
        assert_eq!(config.limits.handshake_timeout(), Duration::from_secs(5));
        assert!(config.network.enable_tcp);
        assert_eq!(config.network.tcp_bind.port(), 0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_payload_bytes = 4096").unwrap();

        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.limits.max_payload_bytes, 4096);
        assert_eq!(config.limits.handshake_timeout_secs, 5);
        assert_eq!(config.network, NetworkConfig::default());
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits\nmax_payload_bytes = ").unwrap();

        assert!(matches!(
            RelayConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RelayConfig::from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_TCP_BIND, "0.0.0.0:7070"),
            (ENV_MAX_PAYLOAD, "1024"),
            (ENV_RUNTIME_DIR, "/run/test"),
            (ENV_HOME, "/home/test"),
        ]);
        let mut config = RelayConfig::default();
        config
            .apply_env(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.network.tcp_bind, "0.0.0.0:7070".parse().unwrap());
        assert_eq!(config.limits.max_payload_bytes, 1024);
        assert_eq!(config.paths.runtime_dir(), PathBuf::from("/run/test"));
        assert_eq!(config.paths.home_dir(), PathBuf::from("/home/test"));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = RelayConfig::default();
        let err = config
            .apply_env(|var| (var == ENV_MAX_PAYLOAD).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_MAX_PAYLOAD, .. }));
    }

    #[test]
    fn test_zero_payload_rejected() {
        let mut config = RelayConfig::default();
        config.limits.max_payload_bytes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPayloadLimit)));
    }
}
