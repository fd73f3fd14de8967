//! # tagbus Client
//!
//! Connects to a peer, sends typed events and dispatches inbound events to
//! registered handlers from a caller-driven poll loop.
//!
//! ```
//! use tagbus_client::{Connection, LoopbackTransport};
//! use tagbus_core::Value;
//!
//! let (transport, peer) = LoopbackTransport::new();
//! let mut conn = Connection::new(transport);
//! conn.register_typed("ping", |(n,): (u64,)| assert_eq!(n, 3)).unwrap();
//! conn.connect("loopback").unwrap();
//!
//! peer.emit("ping", &[Value::Count(3)]).unwrap();
//! let report = conn.process_input().unwrap();
//! assert_eq!(report.dispatched, 1);
//! ```

pub mod connection;
pub mod error;
pub mod registry;
pub mod transport;

pub use connection::{Connection, EventSender, PollReport, State};
pub use error::{BusError, ConnectionError, PollError, RegistryError};
pub use registry::{Dispatch, HandlerRegistry, RegistryHandle};
pub use transport::{LoopbackPeer, LoopbackTransport, TcpTransport, Transport};
