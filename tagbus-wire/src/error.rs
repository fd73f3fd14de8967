//! Codec error types.

use thiserror::Error;

/// An outbound event could not be serialized.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("{what} length {len} exceeds wire limit {max}")]
    TooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Record nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("Encoded message of {size} bytes exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },
}

/// An inbound message is malformed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Insufficient data: needed {needed} bytes, {remaining} remaining")]
    InsufficientData { needed: usize, remaining: usize },

    #[error("Unsupported message version {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown value tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("Invalid boolean byte 0x{0:02x}")]
    InvalidBool(u8),

    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("Invalid address family {0}")]
    InvalidAddressFamily(u8),

    #[error("Prefix length {prefix} out of range for IPv{family}")]
    InvalidPrefix { prefix: u8, family: u8 },

    #[error("Record schema error: {0}")]
    Schema(#[from] tagbus_core::SchemaError),

    #[error("Record field index {index} outside {fields} declared fields")]
    FieldIndex { index: usize, fields: usize },

    #[error("Record field index {0} present more than once")]
    RepeatedField(usize),

    #[error("Record nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

/// Stream framing failures. These are fatal for the stream.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Frame length {len} exceeds maximum {max}")]
    FrameTooLarge { len: usize, max: usize },
}
