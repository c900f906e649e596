//! # Transport
//!
//! Unix and TCP listeners feeding the router task.
//!
//! ```text
//! accept ──→ handshake ──→ reader task ──TransportEvent──→ router task
//!                              │                               │
//!                              └── writer task ←── Bytes ──────┘
//! ```
//!
//! Reader tasks only decode; all routing state stays in the router task.
//! Events of one connection travel through one channel and keep their order.

pub mod connection;
pub mod listener;

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use dr_01_wire_protocol::io::FrameIoError;
use dr_01_wire_protocol::Envelope;
use shared_types::ConnectionHandle;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::bootstrap::SessionCookie;

pub use listener::Listeners;

/// What a connection task reports to the router task.
#[derive(Debug)]
pub enum TransportEvent {
    /// Handshake passed; `writer` queues encoded frames for the peer.
    Accepted {
        handle: ConnectionHandle,
        writer: UnboundedSender<Bytes>,
    },
    /// One decoded envelope.
    Frame {
        handle: ConnectionHandle,
        envelope: Envelope,
    },
    /// The peer went away or broke framing.
    Closed { handle: ConnectionHandle },
}

/// Transport failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("client presented a wrong cookie")]
    CookieRejected,

    #[error(transparent)]
    Frame(#[from] FrameIoError),
}

/// State shared by every listener and connection task.
#[derive(Debug)]
pub struct ListenerContext {
    pub(crate) cookie: SessionCookie,
    pub(crate) max_payload: usize,
    pub(crate) handshake_timeout: Duration,
    pub(crate) events: UnboundedSender<TransportEvent>,
    next_handle: AtomicU64,
}

impl ListenerContext {
    pub fn new(
        cookie: SessionCookie,
        max_payload: usize,
        handshake_timeout: Duration,
        events: UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            cookie,
            max_payload,
            handshake_timeout,
            events,
            next_handle: AtomicU64::new(1),
        }
    }

    /// Allocate a handle; never reused within a process.
    pub(crate) fn next_handle(&self) -> ConnectionHandle {
        ConnectionHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }
}
