//! Error kinds raised synchronously by value constructors and record access.

use thiserror::Error;

use crate::value::Tag;

/// Record schema violations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Duplicate field name '{0}' in record type")]
    DuplicateField(String),

    #[error("Field '{field}' is not declared in record type ({declared})")]
    UnknownField { field: String, declared: String },
}

/// A value lies outside the domain of its type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Count cannot be negative: {0}")]
    NegativeCount(i64),

    #[error("Prefix length {prefix} exceeds {max} for this address family")]
    PrefixLength { prefix: u32, max: u8 },

    #[error("Port number {0} exceeds 65535")]
    PortNumber(u64),
}

/// Text could not be parsed into a value of the requested type.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParseError {
    #[error("Unknown type tag '{0}'")]
    UnknownTag(String),

    #[error("Invalid {tag} literal '{text}'")]
    Invalid { tag: Tag, text: String },

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("Type tag '{0}' cannot be parsed from text")]
    NotParsable(Tag),
}

/// A value was read as a variant it does not hold.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Expected {expected} value, found {actual}")]
pub struct TypeMismatch {
    pub expected: Tag,
    pub actual: Tag,
}
