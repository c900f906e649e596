//! # Frame Codec
//!
//! Fixed-size header plus the length-prefixed field primitives every body
//! is built from.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 12;

/// Default upper bound on a single frame payload (16 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Fixed frame header.
///
/// The opcode is kept raw so that a frame with an unknown opcode can still be
/// skipped by length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw opcode.
    pub opcode: i32,
    /// Correlation key.
    pub key: u32,
    /// Number of payload bytes following the header.
    pub payload_len: u32,
}

impl FrameHeader {
    /// Parse a header from exactly [`HEADER_LEN`] bytes.
    #[must_use]
    pub fn parse(raw: &[u8; HEADER_LEN]) -> Self {
        let mut buf = &raw[..];
        Self {
            opcode: buf.get_i32(),
            key: buf.get_u32(),
            payload_len: buf.get_u32(),
        }
    }

    /// Append the header to `buf`.
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_i32(self.opcode);
        buf.put_u32(self.key);
        buf.put_u32(self.payload_len);
    }

    /// Reject payloads above `max`.
    pub fn check_len(&self, max: usize) -> Result<usize, ProtocolError> {
        let len = self.payload_len as usize;
        if len > max {
            return Err(ProtocolError::PayloadTooLarge { len, max });
        }
        Ok(len)
    }
}

/// Sequential reader over length-prefixed fields.
///
/// Blobs are split off the underlying `Bytes` without copying.
#[derive(Debug, Clone)]
pub struct FieldReader {
    buf: Bytes,
}

impl FieldReader {
    /// Read fields from `buf`.
    #[must_use]
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::Truncated {
                field,
                needed,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, ProtocolError> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_u32())
    }

    /// Read a single byte.
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, ProtocolError> {
        self.ensure(field, 1)?;
        Ok(self.buf.get_u8())
    }

    /// Read a length-prefixed byte blob.
    pub fn read_blob(&mut self, field: &'static str) -> Result<Bytes, ProtocolError> {
        let len = self.read_u32(field)? as usize;
        self.ensure(field, len)?;
        Ok(self.buf.split_to(len))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self, field: &'static str) -> Result<String, ProtocolError> {
        let raw = self.read_blob(field)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8 { field })
    }

    /// True when every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Unconsumed bytes.
    #[must_use]
    pub fn into_remaining(self) -> Bytes {
        self.buf
    }
}

/// Append a length-prefixed string.
pub fn put_string(buf: &mut BytesMut, value: &str) {
    put_blob(buf, value.as_bytes());
}

/// Length prefix for a frame payload; fails above `u32::MAX`.
pub fn wire_len(len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::PayloadTooLarge {
        len,
        max: u32::MAX as usize,
    })
}

/// Append a length-prefixed blob.
///
/// `value` must be shorter than 4 GiB. Every field ends up inside an envelope
/// payload, and `Envelope::encode` rejects payloads that do not fit a `u32`
/// length through [`wire_len`], so a longer field never reaches the wire.
pub fn put_blob(buf: &mut BytesMut, value: &[u8]) {
    buf.reserve(4 + value.len());
    buf.put_u32(value.len() as u32);
    buf.put_slice(value);
}

/// Encoded size of a length-prefixed field.
#[must_use]
pub const fn field_len(value_len: usize) -> usize {
    4 + value_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_is_big_endian() {
        let header = FrameHeader {
            opcode: 2,
            key: 0x0102_0304,
            payload_len: 9,
        };
        let mut buf = BytesMut::new();
        header.write(&mut buf);

        assert_eq!(
            &buf[..],
            &[0, 0, 0, 2, 1, 2, 3, 4, 0, 0, 0, 9][..],
        );

        let raw: [u8; HEADER_LEN] = buf[..].try_into().unwrap();
        assert_eq!(FrameHeader::parse(&raw), header);
    }

    #[test]
    fn test_check_len() {
        let header = FrameHeader {
            opcode: 1,
            key: 0,
            payload_len: 100,
        };
        assert_eq!(header.check_len(100), Ok(100));
        assert_eq!(
            header.check_len(99),
            Err(ProtocolError::PayloadTooLarge { len: 100, max: 99 })
        );
    }

    #[test]
    fn test_wire_len_bounds() {
        assert_eq!(wire_len(0), Ok(0));
        assert_eq!(wire_len(u32::MAX as usize), Ok(u32::MAX));
        assert_eq!(
            wire_len(u32::MAX as usize + 1),
            Err(ProtocolError::PayloadTooLarge {
                len: u32::MAX as usize + 1,
                max: u32::MAX as usize,
            })
        );
    }

    #[test]
    fn test_truncated_string() {
        let mut buf = BytesMut::new();
        buf.put_u32(10);
        buf.put_slice(b"abc");
        let mut reader = FieldReader::new(buf.freeze());

        assert_eq!(
            reader.read_string("from_app"),
            Err(ProtocolError::Truncated {
                field: "from_app",
                needed: 10,
                available: 3,
            })
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = BytesMut::new();
        put_blob(&mut buf, &[0xff, 0xfe]);
        let mut reader = FieldReader::new(buf.freeze());

        assert_eq!(
            reader.read_string("to_app"),
            Err(ProtocolError::InvalidUtf8 { field: "to_app" })
        );
    }

    #[test]
    fn test_blob_leaves_remaining() {
        let mut buf = BytesMut::new();
        put_string(&mut buf, "one");
        buf.put_slice(b"tail");
        let mut reader = FieldReader::new(buf.freeze());

        assert_eq!(reader.read_string("f").unwrap(), "one");
        assert!(!reader.is_empty());
        assert_eq!(&reader.into_remaining()[..], b"tail");
    }
}
