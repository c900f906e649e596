//! # Session Cookie
//!
//! A random per-session secret. Clients read it from the cookie file and
//! present it in the handshake; only processes able to read the file (mode
//! 0600) can connect.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use rand::RngCore;
use subtle::ConstantTimeEq;

use super::BootstrapError;

/// Random bytes per cookie, before hex encoding.
pub const COOKIE_BYTES: usize = 16;

/// The session cookie, hex encoded.
#[derive(Clone)]
pub struct SessionCookie {
    hex: String,
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCookie(..)")
    }
}

impl SessionCookie {
    /// Fresh cookie from the OS random source.
    pub fn generate() -> Self {
        let mut raw = [0u8; COOKIE_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut raw);
        Self {
            hex: hex::encode(raw),
        }
    }

    /// Wrap an existing cookie value.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self { hex: hex.into() }
    }

    /// Bytes a client sends in the handshake.
    pub fn as_bytes(&self) -> &[u8] {
        self.hex.as_bytes()
    }

    /// Constant-time comparison against what a client presented.
    pub fn verify(&self, presented: &[u8]) -> bool {
        self.hex.as_bytes().ct_eq(presented).into()
    }

    /// Write the cookie to `path`, readable by the owner only.
    pub fn write_to(&self, path: &Path) -> Result<(), BootstrapError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BootstrapError::io("failed to create", parent, e))?;
        }
        // An old file may carry looser permissions
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(BootstrapError::io("failed to replace", path, e)),
        }

        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| BootstrapError::io("failed to create cookie file", path, e))?;
        writeln!(file, "{}", self.hex)
            .map_err(|e| BootstrapError::io("failed to write cookie file", path, e))
    }

    /// Read a cookie file written by [`SessionCookie::write_to`].
    pub fn read_from(path: &Path) -> Result<Self, BootstrapError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| BootstrapError::io("failed to read cookie file", path, e))?;
        Ok(Self::from_hex(raw.trim()))
    }
}
