//! # Connection Writers
//!
//! Encodes envelopes and queues them on the writer task of each connection.
//! Queues are unbounded so the router never waits on a slow reader.

use std::collections::HashMap;

use bytes::Bytes;
use dr_01_wire_protocol::Envelope;
use dr_02_message_router::MessageSink;
use shared_types::ConnectionHandle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Writer queues keyed by connection.
#[derive(Debug, Default)]
pub struct ConnectionWriters {
    writers: HashMap<ConnectionHandle, UnboundedSender<Bytes>>,
    frames_sent: u64,
}

impl ConnectionWriters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the writer queue of a freshly accepted connection.
    pub fn attach(&mut self, handle: ConnectionHandle, writer: UnboundedSender<Bytes>) {
        self.writers.insert(handle, writer);
    }

    /// Drop the writer queue; the writer task ends once drained.
    pub fn detach(&mut self, handle: ConnectionHandle) {
        self.writers.remove(&handle);
    }

    /// Drop every writer queue.
    pub fn clear(&mut self) {
        self.writers.clear();
    }

    /// Number of attached connections.
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// Frames queued since start.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

impl MessageSink for ConnectionWriters {
    fn deliver(&mut self, to: ConnectionHandle, envelope: Envelope) {
        let Some(writer) = self.writers.get(&to) else {
            debug!(conn = %to, opcode = %envelope.opcode, "No writer for connection, dropping");
            return;
        };

        let frame = match envelope.encode() {
            Ok(frame) => frame,
            Err(error) => {
                warn!(conn = %to, %error, "Failed to encode envelope");
                return;
            }
        };

        if writer.send(frame).is_err() {
            debug!(conn = %to, "Writer already closed");
            return;
        }
        self.frames_sent += 1;
    }
}
