//! # Shared Types Crate
//!
//! This crate contains the types every DeskRelay crate agrees on.
//!
//! ## Design Principles
//!
//! - **Opaque Handles**: A connection is addressed by a `ConnectionHandle`
//!   assigned by the transport; nothing outside the transport interprets it.
//! - **Identity Rules in One Place**: plain-name derivation, the reserved
//!   server identity and `prefix*` multicast matching live here so that the
//!   router and the signal relay cannot disagree about them.

pub mod entities;
pub mod identity;

pub use entities::ConnectionHandle;
pub use identity::{is_reserved_app_id, plain_app_id, MulticastPattern, SERVER_APP_ID};
