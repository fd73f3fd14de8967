//! # tagbus-core
//!
//! Semantic data model for the tagbus typed event bus.
//! Everything a peer can put on the wire is a [`Value`]; composite payloads
//! are sparse [`Record`]s bound to a [`RecordType`]; handlers declare what
//! they accept with an [`EventSignature`].
//!
//! ### Key Submodules:
//! - `value`: tagged union plus port, address, subnet and time wrappers
//! - `record`: schema-checked sparse records
//! - `signature`: argument signatures and typed conversion for dispatch
//!
//! Byte layout lives in `tagbus-wire`; this crate only defines meaning.

pub mod error;
pub mod record;
pub mod signature;
pub mod value;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::record::*;
    pub use crate::signature::*;
    pub use crate::value::*;
}

pub use error::{ParseError, RangeError, SchemaError, TypeMismatch};
pub use record::{Record, RecordType};
pub use signature::{DispatchError, EventSignature, FromArgs, FromValue};
pub use value::{Interval, Port, Protocol, Subnet, Tag, Time, Value};
