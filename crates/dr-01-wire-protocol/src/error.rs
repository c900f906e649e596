//! Codec errors.

use thiserror::Error;

/// Errors raised while decoding or encoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Header carried an opcode outside the known set.
    #[error("unknown opcode {0}")]
    UnknownOpcode(i32),

    /// A field claimed more bytes than the payload holds.
    #[error("truncated {field}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// A text field was not UTF-8.
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// Declared or produced payload exceeds the configured limit.
    #[error("payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// A marshaled bool was neither 0 nor 1.
    #[error("invalid bool byte {0}")]
    InvalidBool(u8),
}
