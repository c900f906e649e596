//! # Envelope
//!
//! One routed operation: header fields, the two identity strings at the front
//! of the payload, and the opcode-specific body as raw bytes.

use bytes::{Bytes, BytesMut};

use crate::codec::{
    field_len, put_blob, put_string, wire_len, FieldReader, FrameHeader, HEADER_LEN,
};
use crate::error::ProtocolError;
use crate::opcode::Opcode;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Operation.
    pub opcode: Opcode,
    /// Correlation key; `0` asks the router to assign one.
    pub key: u32,
    /// Sender identity.
    pub from_app: String,
    /// Target identity, possibly a `prefix*` pattern.
    pub to_app: String,
    /// Opcode-specific body, unparsed.
    pub body: Bytes,
}

impl Envelope {
    /// Build an envelope.
    pub fn new(
        opcode: Opcode,
        key: u32,
        from_app: impl Into<String>,
        to_app: impl Into<String>,
        body: Bytes,
    ) -> Self {
        Self {
            opcode,
            key,
            from_app: from_app.into(),
            to_app: to_app.into(),
            body,
        }
    }

    /// Decode the payload that followed `header`.
    pub fn decode(header: &FrameHeader, payload: Bytes) -> Result<Self, ProtocolError> {
        let opcode = Opcode::try_from(header.opcode)?;
        let mut reader = FieldReader::new(payload);
        let from_app = reader.read_string("from_app")?;
        let to_app = reader.read_string("to_app")?;

        Ok(Self {
            opcode,
            key: header.key,
            from_app,
            to_app,
            body: reader.into_remaining(),
        })
    }

    /// Payload size once encoded.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        field_len(self.from_app.len()) + field_len(self.to_app.len()) + self.body.len()
    }

    /// Encode header and payload into one frame.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let len = self.payload_len();
        let payload_len = wire_len(len)?;

        let mut buf = BytesMut::with_capacity(HEADER_LEN + len);
        FrameHeader {
            opcode: self.opcode.code(),
            key: self.key,
            payload_len,
        }
        .write(&mut buf);
        put_string(&mut buf, &self.from_app);
        put_string(&mut buf, &self.to_app);
        buf.extend_from_slice(&self.body);

        Ok(buf.freeze())
    }

    /// Same envelope under another opcode.
    #[must_use]
    pub fn with_opcode(mut self, opcode: Opcode) -> Self {
        self.opcode = opcode;
        self
    }

    /// Parse the body as `(object, function, args)`.
    pub fn call_body(&self) -> Result<CallBody, ProtocolError> {
        CallBody::decode(self.body.clone())
    }

    /// Parse the body as `(reply_type, data)`; `None` for an empty body.
    pub fn reply_body(&self) -> Result<Option<ReplyBody>, ProtocolError> {
        if self.body.is_empty() {
            return Ok(None);
        }
        ReplyBody::decode(self.body.clone()).map(Some)
    }
}

/// Body of Send, Call and Find envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallBody {
    /// Target object inside the application.
    pub object: String,
    /// Function, optionally with a parenthesised signature.
    pub function: String,
    /// Marshaled arguments.
    pub args: Bytes,
}

impl CallBody {
    /// Build a call body.
    pub fn new(object: impl Into<String>, function: impl Into<String>, args: Bytes) -> Self {
        Self {
            object: object.into(),
            function: function.into(),
            args,
        }
    }

    /// Decode from raw body bytes.
    pub fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        let mut reader = FieldReader::new(body);
        Ok(Self {
            object: reader.read_string("object")?,
            function: reader.read_string("function")?,
            args: reader.read_blob("args")?,
        })
    }

    /// Encode into raw body bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            field_len(self.object.len()) + field_len(self.function.len()) + field_len(self.args.len()),
        );
        put_string(&mut buf, &self.object);
        put_string(&mut buf, &self.function);
        put_blob(&mut buf, &self.args);
        buf.freeze()
    }

    /// Function name without its signature: `registerAs(string)` → `registerAs`.
    #[must_use]
    pub fn function_name(&self) -> &str {
        match self.function.split_once('(') {
            Some((name, _)) => name,
            None => &self.function,
        }
    }
}

/// Body of reply envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyBody {
    /// Name of the marshaled return type.
    pub reply_type: String,
    /// Marshaled return value.
    pub data: Bytes,
}

impl ReplyBody {
    /// Build a reply body.
    pub fn new(reply_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            reply_type: reply_type.into(),
            data,
        }
    }

    /// Decode from raw body bytes.
    pub fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        let mut reader = FieldReader::new(body);
        Ok(Self {
            reply_type: reader.read_string("reply_type")?,
            data: reader.read_blob("reply_data")?,
        })
    }

    /// Encode into raw body bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf =
            BytesMut::with_capacity(field_len(self.reply_type.len()) + field_len(self.data.len()));
        put_string(&mut buf, &self.reply_type);
        put_blob(&mut buf, &self.data);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_frame(frame: &Bytes) -> (FrameHeader, Bytes) {
        let raw: [u8; HEADER_LEN] = frame[..HEADER_LEN].try_into().unwrap();
        (FrameHeader::parse(&raw), frame.slice(HEADER_LEN..))
    }

    #[test]
    fn test_call_envelope_decodes_fields() {
        let body = CallBody::new("MainWindow", "raise()", Bytes::from_static(b"\x01"));
        let envelope = Envelope::new(Opcode::Call, 9, "editor", "viewer", body.encode());

        let frame = envelope.encode().unwrap();
        let (header, payload) = split_frame(&frame);
        assert_eq!(header.payload_len as usize, payload.len());

        let decoded = Envelope::decode(&header, payload).unwrap();
        assert_eq!(decoded.opcode, Opcode::Call);
        assert_eq!(decoded.key, 9);
        assert_eq!(decoded.from_app, "editor");
        assert_eq!(decoded.to_app, "viewer");

        let call = decoded.call_body().unwrap();
        assert_eq!(call.object, "MainWindow");
        assert_eq!(call.function_name(), "raise");
        assert_eq!(&call.args[..], b"\x01");
    }

    #[test]
    fn test_body_is_forwarded_verbatim() {
        // Body bytes are never re-encoded, even when they are not a valid body.
        let envelope = Envelope::new(
            Opcode::Send,
            0,
            "a",
            "b",
            Bytes::from_static(b"\xde\xad\xbe\xef"),
        );
        let frame = envelope.encode().unwrap();
        let (header, payload) = split_frame(&frame);
        let decoded = Envelope::decode(&header, payload).unwrap();

        assert_eq!(decoded, envelope);
        assert_eq!(decoded.encode().unwrap(), frame);
    }

    #[test]
    fn test_unknown_opcode_rejected() {
        let header = FrameHeader {
            opcode: 42,
            key: 0,
            payload_len: 0,
        };
        assert_eq!(
            Envelope::decode(&header, Bytes::new()),
            Err(ProtocolError::UnknownOpcode(42))
        );
    }

    #[test]
    fn test_missing_to_app_is_truncated() {
        let mut buf = BytesMut::new();
        put_string(&mut buf, "only-from");
        let header = FrameHeader {
            opcode: Opcode::Send.code(),
            key: 0,
            payload_len: buf.len() as u32,
        };

        let err = Envelope::decode(&header, buf.freeze()).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { field: "to_app", .. }));
    }

    #[test]
    fn test_empty_reply_body() {
        let envelope = Envelope::new(Opcode::ReplyFailed, 1, "gone", "caller", Bytes::new());
        assert_eq!(envelope.reply_body(), Ok(None));
    }

    #[test]
    fn test_reply_body_fields() {
        let reply = ReplyBody::new("bool", Bytes::from_static(&[1]));
        let envelope = Envelope::new(Opcode::Reply, 5, "srv", "cli", reply.encode());
        assert_eq!(envelope.reply_body(), Ok(Some(reply)));
    }

    #[test]
    fn test_function_name_without_signature() {
        let call = CallBody::new("", "registeredApplications", Bytes::new());
        assert_eq!(call.function_name(), "registeredApplications");
    }
}
