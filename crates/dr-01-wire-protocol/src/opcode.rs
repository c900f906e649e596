//! Message opcodes.

use std::fmt;

use crate::error::ProtocolError;

/// Operation carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Opcode {
    /// Fire-and-forget message, possibly multicast.
    Send = 1,
    /// Synchronous call expecting a reply.
    Call = 2,
    /// Successful reply to a call.
    Reply = 3,
    /// Failed reply to a call.
    ReplyFailed = 4,
    /// Responder defers the answer; a `ReplyDelayed` follows.
    ReplyWait = 5,
    /// Deferred answer completing a `ReplyWait` exchange.
    ReplyDelayed = 6,
    /// Object lookup; routed like a call but never serviced by the server.
    Find = 7,
}

impl Opcode {
    /// Numeric code on the wire.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Opcodes whose body is a reply (`reply_type`, `data`).
    #[must_use]
    pub const fn is_reply(self) -> bool {
        matches!(
            self,
            Self::Reply | Self::ReplyFailed | Self::ReplyWait | Self::ReplyDelayed
        )
    }
}

impl TryFrom<i32> for Opcode {
    type Error = ProtocolError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Send),
            2 => Ok(Self::Call),
            3 => Ok(Self::Reply),
            4 => Ok(Self::ReplyFailed),
            5 => Ok(Self::ReplyWait),
            6 => Ok(Self::ReplyDelayed),
            7 => Ok(Self::Find),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Send => "Send",
            Self::Call => "Call",
            Self::Reply => "Reply",
            Self::ReplyFailed => "ReplyFailed",
            Self::ReplyWait => "ReplyWait",
            Self::ReplyDelayed => "ReplyDelayed",
            Self::Find => "Find",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        for code in 1..=7 {
            let opcode = Opcode::try_from(code).unwrap();
            assert_eq!(opcode.code(), code);
        }
    }

    #[test]
    fn test_unknown_code_is_error() {
        assert_eq!(Opcode::try_from(0), Err(ProtocolError::UnknownOpcode(0)));
        assert_eq!(Opcode::try_from(8), Err(ProtocolError::UnknownOpcode(8)));
        assert_eq!(Opcode::try_from(-1), Err(ProtocolError::UnknownOpcode(-1)));
    }

    #[test]
    fn test_reply_classification() {
        assert!(Opcode::Reply.is_reply());
        assert!(Opcode::ReplyDelayed.is_reply());
        assert!(!Opcode::Call.is_reply());
        assert!(!Opcode::Find.is_reply());
    }
}
