//! # Message Router (dr-02)
//!
//! The core of DeskRelay: connection bookkeeping, application identities,
//! call/reply pairing and recovery when a peer disappears mid-call.
//!
//! ## Architecture
//!
//! ```text
//! transport ──accept/frame/close──→ RouterApi
//!                                      │
//!                        ┌─────────────┼──────────────┐
//!                        ↓             ↓              ↓
//!                 ConnectionTable  IdentityRegistry  KeyCounter
//!                                      │
//!                   MessageSink ←──────┴──────→ SignalRelay
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Unique identity | An app id is held by at most one connection |
//! | One entry per call | A caller appears in a waiting list once per outstanding call |
//! | Unblock on close | Every caller owed a reply by a closing connection gets `ReplyFailed` with key 1 |
//! | Fail before unregister | Failure replies go out before the closing identity is released |
//! | Multicast is Send | `prefix*` targets only ever receive `Send` |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Connection table, identity registry, correlation keys
//! - `ports/` - `RouterApi` (inbound), `MessageSink` and `SignalRelay` (outbound)
//! - `service/` - `MessageRouter` implementing the dispatch table
//!
//! ## Usage
//!
//! ```ignore
//! use dr_02_message_router::{MessageRouter, RouterApi};
//!
//! let mut router = MessageRouter::new(writers, hub_relay);
//! router.connection_accepted(handle)?;
//! let outcome = router.route(handle, envelope);
//! let report = router.disconnect(handle);
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

/// Recording doubles for the outbound ports.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use domain::{
    Connection, ConnectionTable, CorrelationKey, DisconnectReport, DropReason, IdentityRegistry,
    KeyCounter, Registered, RouteOutcome, RouterError, KEY_COUNTER_SEED, SYNTHETIC_FAILURE_KEY,
};
pub use ports::inbound::RouterApi;
pub use ports::outbound::{
    MessageSink, SignalConnectRequest, SignalDisconnectRequest, SignalRelay, SignalTarget,
};
pub use service::{
    MessageRouter, RouterState, APPLICATION_REGISTERED, APPLICATION_REMOVED, EMIT_OBJECT,
};
