//! # Bootstrap
//!
//! Everything that happens before the router accepts its first connection.
//!
//! ## Startup Sequence
//!
//! 1. Take the startup lock next to the discovery file
//! 2. If the discovery file names a live daemon, send it `SIGHUP` and exit
//! 3. Fork and detach (unless `--nofork` / `--nosid`)
//! 4. Generate the session cookie and write the cookie file (0600)
//! 5. Bind the listeners and publish the discovery file
//!
//! Any failure here is fatal.

pub mod auth;
pub mod daemon;
pub mod discovery;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::container::RelayConfig;

pub use auth::SessionCookie;
pub use daemon::{daemonize, ForkOutcome};
pub use discovery::{DiscoveryRecord, InstanceCheck, StartupLock};

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to read host name: {0}")]
    Hostname(nix::Error),

    #[error("fork failed: {0}")]
    Fork(nix::Error),

    #[error("failed to signal running instance {pid}: {source}")]
    Signal { pid: u32, source: nix::Error },
}

impl BootstrapError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Host and display this daemon serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionScope {
    pub host: String,
    pub display: String,
}

impl SessionScope {
    /// Scope of the current process: host name and `$DISPLAY`.
    pub fn current() -> Result<Self, BootstrapError> {
        let host = nix::unistd::gethostname()
            .map_err(BootstrapError::Hostname)?
            .to_string_lossy()
            .into_owned();
        let display = std::env::var("DISPLAY").ok();
        Ok(Self::new(&host, display.as_deref()))
    }

    /// Scope from raw values; path-unsafe characters become `_`.
    pub fn new(host: &str, display: Option<&str>) -> Self {
        let display = match display {
            Some(display) if !display.is_empty() => display.replace([':', '/'], "_"),
            _ => "nodisplay".to_string(),
        };
        Self {
            host: host.replace('/', "_"),
            display,
        }
    }

    fn suffix(&self) -> String {
        format!("{}_{}", self.host, self.display)
    }
}

/// Every file the daemon creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPaths {
    /// `<home>/.deskrelay_<host>_<display>`
    pub discovery: PathBuf,
    /// Startup lock next to the discovery file.
    pub lock: PathBuf,
    /// `<runtime dir>/deskrelay_<host>_<display>.sock`
    pub socket: PathBuf,
    /// `<runtime dir>/deskrelay-cookie_<host>_<display>`
    pub cookie: PathBuf,
}

impl RelayPaths {
    /// Derive all paths from configuration and scope.
    pub fn resolve(config: &RelayConfig, scope: &SessionScope) -> Self {
        let suffix = scope.suffix();
        let home = config.paths.home_dir();
        let runtime = config.paths.runtime_dir();

        let discovery = home.join(format!(".deskrelay_{suffix}"));
        let mut lock = discovery.clone().into_os_string();
        lock.push(".lock");

        Self {
            lock: PathBuf::from(lock),
            discovery,
            socket: runtime.join(format!("deskrelay_{suffix}.sock")),
            cookie: runtime.join(format!("deskrelay-cookie_{suffix}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_sanitizes_display() {
        let scope = SessionScope::new("box", Some(":0.0"));
        assert_eq!(scope.display, "_0.0");
        assert_eq!(SessionScope::new("box", None).display, "nodisplay");
        assert_eq!(SessionScope::new("box", Some("")).display, "nodisplay");
        assert_eq!(
            SessionScope::new("box", Some("localhost:10/unix")).display,
            "localhost_10_unix"
        );
    }

    #[test]
    fn test_paths_layout() {
        let mut config = RelayConfig::default();
        config.paths.home_dir = Some(PathBuf::from("/home/u"));
        config.paths.runtime_dir = Some(PathBuf::from("/run/user/1"));
        let scope = SessionScope::new("box", Some(":1"));

        let paths = RelayPaths::resolve(&config, &scope);
        assert_eq!(paths.discovery, PathBuf::from("/home/u/.deskrelay_box__1"));
        assert_eq!(paths.lock, PathBuf::from("/home/u/.deskrelay_box__1.lock"));
        assert_eq!(paths.socket, PathBuf::from("/run/user/1/deskrelay_box__1.sock"));
        assert_eq!(paths.cookie, PathBuf::from("/run/user/1/deskrelay-cookie_box__1"));
    }
}
