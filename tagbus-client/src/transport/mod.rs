//! ## tagbus-client::transport
//! The byte-moving collaborator behind a [`Connection`](crate::Connection).
//!
//! Transports deliver whole messages. Nothing here may block waiting for
//! the network: `try_receive` returns `Ok(None)` when no complete message
//! is buffered, and `try_send` returns [`ConnectionError::Backpressure`]
//! rather than buffer without bound.

use bytes::Bytes;

use crate::error::ConnectionError;

pub mod loopback;
pub mod tcp;

pub use loopback::{LoopbackPeer, LoopbackTransport};
pub use tcp::TcpTransport;

pub trait Transport {
    /// Per-connection state owned by the [`Connection`](crate::Connection).
    type Session;

    fn connect(&mut self, endpoint: &str) -> Result<Self::Session, ConnectionError>;

    fn try_send(
        &mut self,
        session: &mut Self::Session,
        message: Bytes,
    ) -> Result<(), ConnectionError>;

    fn try_receive(&mut self, session: &mut Self::Session)
        -> Result<Option<Bytes>, ConnectionError>;

    /// How many `try_receive` calls would currently return something other
    /// than `Ok(None)`, a pending error included. May pull already-arrived
    /// bytes off the network but never waits.
    fn ready(&mut self, session: &mut Self::Session) -> Result<usize, ConnectionError>;

    /// Largest message the transport can carry, if it has a limit of its own.
    fn max_message_size(&self) -> Option<usize> {
        None
    }

    fn close(&mut self, session: Self::Session);
}
