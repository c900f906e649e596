//! Test doubles for the outbound ports.

use bytes::Bytes;
use dr_01_wire_protocol::{Envelope, Opcode};
use shared_types::ConnectionHandle;

use crate::ports::outbound::{
    MessageSink, SignalConnectRequest, SignalDisconnectRequest, SignalRelay, SignalTarget,
};

/// Records every delivery in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub delivered: Vec<(ConnectionHandle, Envelope)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&mut self) -> Vec<(ConnectionHandle, Envelope)> {
        std::mem::take(&mut self.delivered)
    }

    /// Envelopes delivered to `handle`.
    pub fn to(&self, handle: ConnectionHandle) -> Vec<&Envelope> {
        self.delivered
            .iter()
            .filter(|(to, _)| *to == handle)
            .map(|(_, envelope)| envelope)
            .collect()
    }

    /// Deliveries with the given opcode.
    pub fn with_opcode(&self, opcode: Opcode) -> Vec<&(ConnectionHandle, Envelope)> {
        self.delivered
            .iter()
            .filter(|(_, envelope)| envelope.opcode == opcode)
            .collect()
    }
}

impl MessageSink for RecordingSink {
    fn deliver(&mut self, to: ConnectionHandle, envelope: Envelope) {
        self.delivered.push((to, envelope));
    }
}

/// Records signal requests and answers with canned results.
#[derive(Debug)]
pub struct RecordingSignalRelay {
    pub connected: Vec<(ConnectionHandle, SignalConnectRequest)>,
    pub disconnected: Vec<(ConnectionHandle, SignalDisconnectRequest)>,
    pub emitted: Vec<(String, String, Bytes)>,
    pub removed: Vec<(ConnectionHandle, Option<String>)>,
    /// Returned by every `emit`.
    pub emit_targets: Vec<SignalTarget>,
    /// Returned by `connect` and `disconnect`.
    pub accept: bool,
}

impl Default for RecordingSignalRelay {
    fn default() -> Self {
        Self {
            connected: Vec::new(),
            disconnected: Vec::new(),
            emitted: Vec::new(),
            removed: Vec::new(),
            emit_targets: Vec::new(),
            accept: true,
        }
    }
}

impl RecordingSignalRelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalRelay for RecordingSignalRelay {
    fn emit(&mut self, origin_app: &str, name: &str, args: &Bytes) -> Vec<SignalTarget> {
        self.emitted
            .push((origin_app.to_string(), name.to_string(), args.clone()));
        self.emit_targets.clone()
    }

    fn connect(&mut self, receiver: ConnectionHandle, request: SignalConnectRequest) -> bool {
        self.connected.push((receiver, request));
        self.accept
    }

    fn disconnect(&mut self, receiver: ConnectionHandle, request: SignalDisconnectRequest) -> bool {
        self.disconnected.push((receiver, request));
        self.accept
    }

    fn connection_removed(&mut self, handle: ConnectionHandle, app_id: Option<&str>) {
        self.removed.push((handle, app_id.map(str::to_string)));
    }
}
