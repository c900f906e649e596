//! Domain Errors for the Message Router

use dr_01_wire_protocol::ProtocolError;
use shared_types::ConnectionHandle;
use thiserror::Error;

/// Errors raised while routing or servicing a message.
///
/// None of these are fatal to the router; they surface either as a
/// `ReplyFailed` to a caller or as a log line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The transport reported the same handle twice.
    #[error("connection {0} is already in the table")]
    DuplicateConnection(ConnectionHandle),

    /// A handle that is not in the table.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionHandle),

    /// No built-in server function by that name.
    #[error("no built-in function {0:?}")]
    UnknownFunction(String),

    /// Arguments of a built-in call could not be unmarshaled.
    #[error("malformed arguments for {function}: {source}")]
    BadArguments {
        function: String,
        source: ProtocolError,
    },

    /// Name refused by `registerAs`.
    #[error("name {0:?} cannot be registered")]
    InvalidName(String),

    /// Body of a message addressed to the server could not be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
