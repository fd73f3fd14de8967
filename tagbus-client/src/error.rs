use thiserror::Error;

use tagbus_core::{DispatchError, ParseError, RangeError, SchemaError};
use tagbus_wire::{DecodeError, EncodingError, FrameError};

use crate::connection::{PollReport, State};

/// Transport and lifecycle failures.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection is not established (state: {0:?})")]
    NotConnected(State),

    #[error("Connection already in state {0:?}")]
    AlreadyStarted(State),

    #[error("Connection is closed")]
    Closed,

    #[error("Connecting to {endpoint} failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    #[error("Peer closed the connection")]
    PeerClosed,

    /// Not fatal; the message was not accepted and may be sent again.
    #[error("Transport write buffer is full ({pending} bytes pending)")]
    Backpressure { pending: usize },

    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("A handler for event '{0}' is already registered")]
    Duplicate(String),

    #[error("Signature for event '{0}' does not match the handler's argument types")]
    SignatureMismatch(String),
}

/// Every error a caller of the client can observe.
#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Malformed inbound message: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A poll pass cut short by a transport failure.
#[derive(Debug, Error)]
#[error("Poll pass aborted after {} messages: {}", .report.received, .error)]
pub struct PollError {
    #[source]
    pub error: ConnectionError,
    /// Everything the pass did before the failure.
    pub report: PollReport,
}
