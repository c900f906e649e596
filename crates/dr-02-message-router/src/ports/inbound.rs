//! # Inbound Ports (Driving Ports)
//!
//! Events the transport boundary feeds into the router. Every call runs to
//! completion without blocking; outbound envelopes leave through the
//! [`MessageSink`](super::outbound::MessageSink) before the call returns.

use dr_01_wire_protocol::Envelope;
use shared_types::ConnectionHandle;

use crate::domain::{DisconnectReport, RouteOutcome, RouterError};

/// Primary API of the message router.
pub trait RouterApi {
    /// A transport session finished its handshake.
    ///
    /// Called exactly once per session, before any envelope from it.
    fn connection_accepted(&mut self, handle: ConnectionHandle) -> Result<(), RouterError>;

    /// Route one decoded envelope received on `from`.
    fn route(&mut self, from: ConnectionHandle, envelope: Envelope) -> RouteOutcome;

    /// A transport session closed.
    ///
    /// Fails every call still owed by the connection, releases its identity,
    /// then forgets it. Returns `None` for an unknown handle.
    fn disconnect(&mut self, handle: ConnectionHandle) -> Option<DisconnectReport>;
}
