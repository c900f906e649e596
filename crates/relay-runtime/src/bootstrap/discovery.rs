//! # Discovery File
//!
//! Clients find the daemon through a per-session file:
//!
//! ```text
//! local:/run/user/1000/deskrelay_box__0.sock,tcp:127.0.0.1:40123
//! 4711
//! ```
//!
//! Line 1 lists the listener addresses, line 2 the daemon PID. A file whose
//! PID is no longer running is stale and gets replaced.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use super::BootstrapError;

/// Parsed discovery file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRecord {
    /// `local:<path>` / `tcp:<ip:port>` entries.
    pub addresses: Vec<String>,
    /// Daemon PID.
    pub pid: u32,
}

impl DiscoveryRecord {
    /// Record for this process.
    pub fn for_current_process(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            pid: std::process::id(),
        }
    }

    /// File contents.
    pub fn render(&self) -> String {
        format!("{}\n{}\n", self.addresses.join(","), self.pid)
    }

    /// Parse file contents; `None` when the PID line is missing or garbled.
    pub fn parse(contents: &str) -> Option<Self> {
        let mut lines = contents.lines();
        let addresses = lines
            .next()?
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect();
        let pid = lines.next()?.trim().parse().ok()?;
        Some(Self { addresses, pid })
    }
}

/// What an existing discovery file says about a running daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceCheck {
    /// No discovery file.
    Absent,
    /// File present but its daemon is gone or the file is unreadable.
    Stale,
    /// Another daemon is serving this session.
    Running(DiscoveryRecord),
}

/// Inspect the discovery file at `path`.
pub fn check_existing(path: &Path) -> Result<InstanceCheck, BootstrapError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(InstanceCheck::Absent),
        Err(e) => return Err(BootstrapError::io("failed to read", path, e)),
    };

    match DiscoveryRecord::parse(&contents) {
        Some(record) if record.pid != std::process::id() && is_process_running(record.pid) => {
            Ok(InstanceCheck::Running(record))
        }
        Some(record) => {
            debug!(pid = record.pid, path = %path.display(), "Discovery file is stale");
            Ok(InstanceCheck::Stale)
        }
        None => {
            warn!(path = %path.display(), "Discovery file is garbled, treating as stale");
            Ok(InstanceCheck::Stale)
        }
    }
}

/// Ask a running daemon to refresh its discovery file.
pub fn notify_running(pid: u32) -> Result<(), BootstrapError> {
    let raw = i32::try_from(pid).map_err(|_| BootstrapError::Signal {
        pid,
        source: nix::Error::ESRCH,
    })?;
    kill(Pid::from_raw(raw), Signal::SIGHUP)
        .map_err(|source| BootstrapError::Signal { pid, source })
}

/// Write `record` to `path`, replacing any previous file.
pub fn write(path: &Path, record: &DiscoveryRecord) -> Result<(), BootstrapError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BootstrapError::io("failed to create", parent, e))?;
    }
    fs::write(path, record.render())
        .map_err(|e| BootstrapError::io("failed to write", path, e))?;
    info!(
        path = %path.display(),
        addresses = %record.addresses.join(","),
        "Discovery file written"
    );
    Ok(())
}

/// Remove the discovery file, ignoring a file that is already gone.
pub fn remove(path: &Path) -> Result<(), BootstrapError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BootstrapError::io("failed to remove", path, e)),
    }
}

/// Check if a process is still running.
pub fn is_process_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

/// Exclusive lock serializing daemon startup for one session.
///
/// The lock belongs to the open file, so a forked daemon keeps holding it
/// after the parent exits. It is released when the last copy is dropped.
#[derive(Debug)]
pub struct StartupLock {
    _file: File,
    path: PathBuf,
}

impl StartupLock {
    /// Block until the lock at `path` is ours.
    pub fn acquire(path: &Path) -> Result<Self, BootstrapError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BootstrapError::io("failed to create", parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| BootstrapError::io("failed to open lock file", path, e))?;

        file.lock_exclusive()
            .map_err(|e| BootstrapError::io("failed to lock", path, e))?;
        writeln!(file, "{}", std::process::id())
            .map_err(|e| BootstrapError::io("failed to write", path, e))?;

        debug!(path = %path.display(), "Startup lock acquired");
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
