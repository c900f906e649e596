//! # DeskRelay Runtime
//!
//! Library side of the `deskrelayd` daemon.
//!
//! ## Modular Structure
//!
//! - `cli` - Command line flags
//! - `container/` - Layered configuration
//! - `bootstrap/` - Session paths, discovery file, cookie, daemonizing
//! - `transport/` - Unix and TCP listeners, per-connection tasks
//! - `adapters/` - Router ports bound to writers and the signal hub
//! - `server` - The router task

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod bootstrap;
pub mod cli;
pub mod container;
pub mod server;
pub mod transport;

pub use cli::Cli;
pub use container::RelayConfig;
pub use server::{spawn_signal_forwarder, ControlEvent, RelayRouter, RelayServer};
