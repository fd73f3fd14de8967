//! ## tagbus-core::signature
//! **Static argument signatures and typed conversion**
//!
//! A typed handler declares the exact tag of each positional argument.
//! Dispatch requires exact arity and exact tags; there is no widening, so an
//! `int` is never accepted where a `count` is expected.
//!
//! [`FromArgs`] is implemented for tuples of up to twelve [`FromValue`]
//! types. The tuple's element types *are* the signature:
//!
//! ```
//! use tagbus_core::{EventSignature, FromArgs, Tag};
//!
//! assert_eq!(
//!     <(u64, bool)>::signature(),
//!     EventSignature::new(vec![Tag::Count, Tag::Bool])
//! );
//! ```

use std::net::IpAddr;

use thiserror::Error;

use crate::error::TypeMismatch;
use crate::record::{Record, RecordType};
use crate::value::{Interval, Port, Subnet, Tag, Time, Value};

/// Inbound arguments that do not fit a typed handler.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Event '{event}' expects {expected} arguments, received {actual}")]
    Arity {
        event: String,
        expected: usize,
        actual: usize,
    },

    #[error("Event '{event}' argument {position} expects {expected}, received {actual}")]
    TypeMismatch {
        event: String,
        position: usize,
        expected: Tag,
        actual: Tag,
    },

    #[error("Event '{event}' argument {position} expects {expected}, received {actual}")]
    RecordTypeMismatch {
        event: String,
        position: usize,
        expected: RecordType,
        actual: RecordType,
    },
}

/// Expected argument tags for one handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EventSignature {
    /// Any arity, any tags; arguments are delivered raw.
    #[default]
    Untyped,
    /// Exact positional tags. Record arguments listed in `record_types`
    /// must also carry that exact record type.
    Typed {
        tags: Vec<Tag>,
        record_types: Vec<(usize, RecordType)>,
    },
}

impl EventSignature {
    /// A zero-length tag list yields [`EventSignature::Untyped`].
    pub fn new(tags: impl Into<Vec<Tag>>) -> Self {
        let tags = tags.into();
        if tags.is_empty() {
            EventSignature::Untyped
        } else {
            EventSignature::Typed {
                tags,
                record_types: Vec::new(),
            }
        }
    }

    /// Pins the record argument at `position` to `record_type`. Has no
    /// effect on an untyped signature.
    pub fn with_record_type(mut self, position: usize, record_type: RecordType) -> Self {
        if let EventSignature::Typed { record_types, .. } = &mut self {
            record_types.retain(|(p, _)| *p != position);
            record_types.push((position, record_type));
            record_types.sort_by_key(|(p, _)| *p);
        }
        self
    }

    pub fn untyped() -> Self {
        EventSignature::Untyped
    }

    pub fn tags(&self) -> Option<&[Tag]> {
        match self {
            EventSignature::Untyped => None,
            EventSignature::Typed { tags, .. } => Some(tags),
        }
    }

    pub fn is_typed(&self) -> bool {
        matches!(self, EventSignature::Typed { .. })
    }

    /// Validates `args` against the signature without consuming them.
    pub fn check(&self, event: &str, args: &[Value]) -> Result<(), DispatchError> {
        let EventSignature::Typed { tags, record_types } = self else {
            return Ok(());
        };
        if tags.len() != args.len() {
            return Err(DispatchError::Arity {
                event: event.to_string(),
                expected: tags.len(),
                actual: args.len(),
            });
        }
        if let Some(position) = tags
            .iter()
            .zip(args)
            .position(|(expected, arg)| *expected != arg.tag())
        {
            return Err(DispatchError::TypeMismatch {
                event: event.to_string(),
                position,
                expected: tags[position],
                actual: args[position].tag(),
            });
        }
        for (position, expected) in record_types {
            if let Some(Value::Record(record)) = args.get(*position) {
                if record.record_type() != expected {
                    return Err(DispatchError::RecordTypeMismatch {
                        event: event.to_string(),
                        position: *position,
                        expected: expected.clone(),
                        actual: record.record_type().clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A native type a single argument unwraps to.
pub trait FromValue: Sized {
    const TAG: Tag;

    fn from_value(value: Value) -> Result<Self, TypeMismatch>;
}

macro_rules! from_value {
    ($($native:ty => $tag:ident),* $(,)?) => {
        $(
            impl FromValue for $native {
                const TAG: Tag = Tag::$tag;

                fn from_value(value: Value) -> Result<Self, TypeMismatch> {
                    <$native>::try_from(value)
                }
            }
        )*
    };
}

from_value! {
    i64 => Int,
    u64 => Count,
    Time => Time,
    Interval => Interval,
    bool => Bool,
    f64 => Double,
    String => String,
    Port => Port,
    IpAddr => Addr,
    Subnet => Subnet,
    Record => Record,
}

/// A full argument list a typed handler accepts.
pub trait FromArgs: Sized {
    fn signature() -> EventSignature;

    /// Checks `args` against [`FromArgs::signature`] and converts them.
    /// Nothing is converted unless every argument matches.
    fn from_args(event: &str, args: Vec<Value>) -> Result<Self, DispatchError>;
}

impl FromArgs for () {
    fn signature() -> EventSignature {
        EventSignature::Untyped
    }

    fn from_args(_event: &str, _args: Vec<Value>) -> Result<Self, DispatchError> {
        Ok(())
    }
}

fn next_arg<T: FromValue>(
    event: &str,
    (expected, actual): (usize, usize),
    args: &mut impl Iterator<Item = (usize, Value)>,
) -> Result<T, DispatchError> {
    let (position, value) = args.next().ok_or_else(|| DispatchError::Arity {
        event: event.to_string(),
        expected,
        actual,
    })?;
    T::from_value(value).map_err(|mismatch| DispatchError::TypeMismatch {
        event: event.to_string(),
        position,
        expected: mismatch.expected,
        actual: mismatch.actual,
    })
}

macro_rules! tuple_from_args {
    ($($name:ident),+) => {
        impl<$($name: FromValue),+> FromArgs for ($($name,)+) {
            fn signature() -> EventSignature {
                EventSignature::new(vec![$($name::TAG),+])
            }

            fn from_args(event: &str, args: Vec<Value>) -> Result<Self, DispatchError> {
                let signature = Self::signature();
                signature.check(event, &args)?;
                let arity = (signature.tags().map_or(0, <[Tag]>::len), args.len());
                let mut args = args.into_iter().enumerate();
                Ok(($(next_arg::<$name>(event, arity, &mut args)?,)+))
            }
        }
    };
}

tuple_from_args!(A);
tuple_from_args!(A, B);
tuple_from_args!(A, B, C);
tuple_from_args!(A, B, C, D);
tuple_from_args!(A, B, C, D, E);
tuple_from_args!(A, B, C, D, E, F);
tuple_from_args!(A, B, C, D, E, F, G);
tuple_from_args!(A, B, C, D, E, F, G, H);
tuple_from_args!(A, B, C, D, E, F, G, H, I);
tuple_from_args!(A, B, C, D, E, F, G, H, I, J);
tuple_from_args!(A, B, C, D, E, F, G, H, I, J, K);
tuple_from_args!(A, B, C, D, E, F, G, H, I, J, K, L);
