//! # Daemonizing
//!
//! Must run before the async runtime starts any thread.

use nix::unistd::{fork, setsid, ForkResult, Pid};
use tracing::{debug, warn};

use super::BootstrapError;

/// Which side of the fork we are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkOutcome {
    /// The original process; it should exit.
    Parent(Pid),
    /// The daemon.
    Daemon,
}

/// Fork into the background unless `no_fork`, then start a new session
/// unless `no_sid`.
pub fn daemonize(no_fork: bool, no_sid: bool) -> Result<ForkOutcome, BootstrapError> {
    if !no_fork {
        // SAFETY: called from `main` before the tokio runtime or any other
        // thread exists, so the child inherits a consistent single-threaded state.
        match unsafe { fork() }.map_err(BootstrapError::Fork)? {
            ForkResult::Parent { child } => return Ok(ForkOutcome::Parent(child)),
            ForkResult::Child => {}
        }
    }

    if !no_sid {
        match setsid() {
            Ok(session) => debug!(session = %session, "Started new session"),
            // A process group leader cannot start a session; keep running.
            Err(e) => warn!(error = %e, "setsid failed"),
        }
    }

    Ok(ForkOutcome::Daemon)
}
