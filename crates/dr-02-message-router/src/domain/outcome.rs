//! Results of routing one envelope or tearing down one connection.

use std::fmt;

use shared_types::ConnectionHandle;

/// What the router did with an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Forwarded verbatim to one connection.
    Forwarded(ConnectionHandle),
    /// Delivered as `Send` to this many matching connections.
    Multicast(usize),
    /// Handled by the built-in server object.
    Serviced,
    /// Built-in server object failed; a `ReplyFailed` went out for calls.
    ServiceFailed,
    /// Not delivered anywhere.
    Dropped(DropReason),
}

/// Why an envelope was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The sending handle is not in the connection table.
    UnknownSender,
    /// No connection holds the target identity.
    UnknownTarget,
    /// Reply from a connection that owed the target nothing.
    NotWaiting,
    /// `ReplyDelayed` without a preceding `ReplyWait`.
    NotDelayed,
    /// `Find` addressed at the server identity.
    ServerFind,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSender => write!(f, "unknown sender"),
            Self::UnknownTarget => write!(f, "unknown target"),
            Self::NotWaiting => write!(f, "target was not waiting for a reply"),
            Self::NotDelayed => write!(f, "target was not waiting for a delayed reply"),
            Self::ServerFind => write!(f, "find addressed to the server"),
        }
    }
}

/// Summary of one connection teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReport {
    /// The closed connection.
    pub handle: ConnectionHandle,
    /// Identity it held, if any.
    pub app_id: Option<String>,
    /// Number of synthesized `ReplyFailed` envelopes.
    pub aborted_calls: usize,
}
