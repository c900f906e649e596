//! # Argument Marshaling
//!
//! Encoding of the argument and return values understood by the built-in
//! server object. Applications may use any encoding among themselves; the
//! router only looks inside bodies addressed to the server identity.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{put_string, FieldReader};
use crate::envelope::ReplyBody;
use crate::error::ProtocolError;

/// Reply type names.
pub mod reply_type {
    /// No return value.
    pub const VOID: &str = "void";
    /// One byte, 0 or 1.
    pub const BOOL: &str = "bool";
    /// Length-prefixed UTF-8 string.
    pub const STRING: &str = "string";
    /// `u32` count followed by strings.
    pub const STRING_LIST: &str = "string[]";
}

/// Builder for a marshaled argument blob.
#[derive(Debug, Default)]
pub struct ArgWriter {
    buf: BytesMut,
}

impl ArgWriter {
    /// Empty blob.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string.
    #[must_use]
    pub fn string(mut self, value: &str) -> Self {
        put_string(&mut self.buf, value);
        self
    }

    /// Append a bool.
    #[must_use]
    pub fn boolean(mut self, value: bool) -> Self {
        self.buf.put_u8(u8::from(value));
        self
    }

    /// Append a string list.
    ///
    /// The count shares the 4 GiB bound of [`put_string`] fields.
    #[must_use]
    pub fn string_list<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        self.buf.put_u32(values.len() as u32);
        for value in values {
            put_string(&mut self.buf, value.as_ref());
        }
        self
    }

    /// Finished blob.
    #[must_use]
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reader over a marshaled argument blob.
#[derive(Debug, Clone)]
pub struct ArgReader {
    fields: FieldReader,
}

impl ArgReader {
    /// Read arguments from `args`.
    #[must_use]
    pub fn new(args: Bytes) -> Self {
        Self {
            fields: FieldReader::new(args),
        }
    }

    /// Next string argument.
    pub fn string(&mut self) -> Result<String, ProtocolError> {
        self.fields.read_string("argument")
    }

    /// Next bool argument.
    pub fn boolean(&mut self) -> Result<bool, ProtocolError> {
        match self.fields.read_u8("argument")? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidBool(other)),
        }
    }

    /// Next string-list argument.
    pub fn string_list(&mut self) -> Result<Vec<String>, ProtocolError> {
        let count = self.fields.read_u32("argument")? as usize;
        // The count is untrusted; cap the preallocation.
        let mut values = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            values.push(self.fields.read_string("argument")?);
        }
        Ok(values)
    }
}

/// Return value of a built-in server function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnValue {
    /// `void`.
    Void,
    /// `bool`.
    Bool(bool),
    /// `string`.
    String(String),
    /// `string[]`.
    StringList(Vec<String>),
}

impl ReturnValue {
    /// Marshal into a reply body.
    #[must_use]
    pub fn into_reply_body(self) -> ReplyBody {
        match self {
            Self::Void => ReplyBody::new(reply_type::VOID, Bytes::new()),
            Self::Bool(value) => {
                ReplyBody::new(reply_type::BOOL, ArgWriter::new().boolean(value).finish())
            }
            Self::String(value) => {
                ReplyBody::new(reply_type::STRING, ArgWriter::new().string(&value).finish())
            }
            Self::StringList(values) => ReplyBody::new(
                reply_type::STRING_LIST,
                ArgWriter::new().string_list(&values).finish(),
            ),
        }
    }

    /// Unmarshal a reply body; unknown type names yield `None`.
    pub fn from_reply_body(body: &ReplyBody) -> Result<Option<Self>, ProtocolError> {
        let mut reader = ArgReader::new(body.data.clone());
        let value = match body.reply_type.as_str() {
            reply_type::VOID => Self::Void,
            reply_type::BOOL => Self::Bool(reader.boolean()?),
            reply_type::STRING => Self::String(reader.string()?),
            reply_type::STRING_LIST => Self::StringList(reader.string_list()?),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}
