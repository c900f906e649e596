//! # Outbound Ports (Driven Ports)
//!
//! Interfaces the host implements for the router.
//!
//! Production: `ConnectionWriters` and `HubRelay` (relay-runtime/adapters)
//! Testing: `RecordingSink` and `RecordingSignalRelay` (`testing` module)

use bytes::Bytes;
use dr_01_wire_protocol::Envelope;
use shared_types::ConnectionHandle;

/// Delivery of envelopes to live connections.
pub trait MessageSink {
    /// Queue `envelope` for the connection `to`.
    ///
    /// Must not block. Delivery to a connection that is already gone is
    /// silently lost.
    fn deliver(&mut self, to: ConnectionHandle, envelope: Envelope);
}

/// Arguments of `connectSignal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalConnectRequest {
    pub sender_app: String,
    pub sender_obj: String,
    pub signal: String,
    pub receiver_obj: String,
    pub slot: String,
    pub volatile: bool,
}

/// Arguments of `disconnectSignal`; empty fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalDisconnectRequest {
    pub sender_app: String,
    pub sender_obj: String,
    pub signal: String,
    pub receiver_obj: String,
    pub slot: String,
}

/// One slot to invoke for an emitted signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalTarget {
    pub receiver: ConnectionHandle,
    pub receiver_obj: String,
    pub slot: String,
    pub args: Bytes,
}

/// The one-to-many signal subsystem.
pub trait SignalRelay {
    /// Fan out `name` (`senderObj#signal`) emitted by `origin_app`.
    fn emit(&mut self, origin_app: &str, name: &str, args: &Bytes) -> Vec<SignalTarget>;

    /// Connect a slot owned by `receiver`.
    fn connect(&mut self, receiver: ConnectionHandle, request: SignalConnectRequest) -> bool;

    /// Disconnect slots owned by `receiver`.
    fn disconnect(&mut self, receiver: ConnectionHandle, request: SignalDisconnectRequest) -> bool;

    /// Forget everything tied to a closed connection.
    fn connection_removed(&mut self, handle: ConnectionHandle, app_id: Option<&str>);
}
