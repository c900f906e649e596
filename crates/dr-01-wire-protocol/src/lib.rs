//! # Wire Protocol
//!
//! Encodes and decodes the envelopes exchanged between applications and the
//! router over a length-framed byte stream.
//!
//! ## Frame Layout
//!
//! ```text
//! ┌────────────┬────────────┬──────────────────┬──────────────────────────────┐
//! │ opcode i32 │ key u32    │ payload_len u32  │ payload (payload_len bytes)  │
//! └────────────┴────────────┴──────────────────┴──────────────────────────────┘
//!
//! payload = from_app:str  to_app:str  body
//! body    = object:str function:str args:blob        (Send / Call / Find)
//!         | reply_type:str data:blob                  (reply opcodes, may be empty)
//! str     = u32 length + UTF-8 bytes
//! blob    = u32 length + raw bytes
//! ```
//!
//! All integers are big-endian. The body is kept as raw bytes in
//! [`Envelope`] so that forwarding is byte-for-byte verbatim; it is only
//! parsed when the router services a message itself.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod marshal;
pub mod opcode;

/// Async frame I/O and the transport handshake.
/// Requires feature: `io`
#[cfg(feature = "io")]
pub mod io;

pub use codec::{FrameHeader, DEFAULT_MAX_PAYLOAD, HEADER_LEN};
pub use envelope::{CallBody, Envelope, ReplyBody};
pub use error::ProtocolError;
pub use marshal::{reply_type, ArgReader, ArgWriter, ReturnValue};
pub use opcode::Opcode;
