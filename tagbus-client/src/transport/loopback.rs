//! In-memory transport for tests and local wiring.
//!
//! The [`LoopbackPeer`] half plays the remote side: it injects inbound
//! messages, inspects what the client sent, and can simulate failures.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use tagbus_core::Value;
use tagbus_wire::{DecodeError, EncodingError, Event, EventCodec};

use crate::error::ConnectionError;
use crate::transport::Transport;

#[derive(Default)]
struct Shared {
    inbound: VecDeque<Bytes>,
    outbound: Vec<Bytes>,
    connected: bool,
    echo: bool,
    refuse: Option<String>,
    fail_receive: bool,
    peer_closed: bool,
}

pub struct LoopbackTransport {
    shared: Arc<Mutex<Shared>>,
}

/// Handle for the remote end of a [`LoopbackTransport`].
#[derive(Clone)]
pub struct LoopbackPeer {
    shared: Arc<Mutex<Shared>>,
    codec: EventCodec,
}

#[derive(Debug)]
pub struct LoopbackSession;

impl LoopbackTransport {
    pub fn new() -> (Self, LoopbackPeer) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: shared.clone(),
            },
            LoopbackPeer {
                shared,
                codec: EventCodec::new(),
            },
        )
    }

    /// A transport whose peer reflects every sent message back inbound.
    pub fn echo() -> (Self, LoopbackPeer) {
        let (transport, peer) = Self::new();
        transport.shared.lock().echo = true;
        (transport, peer)
    }
}

impl Transport for LoopbackTransport {
    type Session = LoopbackSession;

    fn connect(&mut self, endpoint: &str) -> Result<LoopbackSession, ConnectionError> {
        let mut shared = self.shared.lock();
        if let Some(reason) = &shared.refuse {
            return Err(ConnectionError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: reason.clone(),
            });
        }
        shared.connected = true;
        shared.peer_closed = false;
        Ok(LoopbackSession)
    }

    fn try_send(
        &mut self,
        _session: &mut LoopbackSession,
        message: Bytes,
    ) -> Result<(), ConnectionError> {
        let mut shared = self.shared.lock();
        if shared.peer_closed {
            return Err(ConnectionError::PeerClosed);
        }
        if shared.echo {
            shared.inbound.push_back(message.clone());
        }
        shared.outbound.push(message);
        Ok(())
    }

    fn try_receive(
        &mut self,
        _session: &mut LoopbackSession,
    ) -> Result<Option<Bytes>, ConnectionError> {
        let mut shared = self.shared.lock();
        if shared.fail_receive {
            shared.fail_receive = false;
            return Err(ConnectionError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "simulated receive failure",
            )));
        }
        match shared.inbound.pop_front() {
            Some(message) => Ok(Some(message)),
            None if shared.peer_closed => Err(ConnectionError::PeerClosed),
            None => Ok(None),
        }
    }

    fn ready(&mut self, _session: &mut LoopbackSession) -> Result<usize, ConnectionError> {
        let shared = self.shared.lock();
        let pending_error = shared.fail_receive || shared.peer_closed;
        Ok(shared.inbound.len() + usize::from(pending_error))
    }

    fn close(&mut self, _session: LoopbackSession) {
        self.shared.lock().connected = false;
    }
}

impl LoopbackPeer {
    /// Queues a raw message for the client to receive.
    pub fn inject(&self, message: impl Into<Bytes>) {
        self.shared.lock().inbound.push_back(message.into());
    }

    /// Encodes and queues an event for the client to receive.
    pub fn emit(&self, name: &str, args: &[Value]) -> Result<(), EncodingError> {
        let message = self.codec.encode(name, args)?;
        self.inject(message);
        Ok(())
    }

    /// Raw messages the client has sent so far.
    pub fn sent(&self) -> Vec<Bytes> {
        self.shared.lock().outbound.clone()
    }

    /// Drains and decodes everything the client has sent.
    pub fn take_sent_events(&self) -> Result<Vec<Event>, DecodeError> {
        let sent = std::mem::take(&mut self.shared.lock().outbound);
        sent.into_iter().map(|m| self.codec.decode(m)).collect()
    }

    pub fn pending_inbound(&self) -> usize {
        self.shared.lock().inbound.len()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    /// Makes subsequent connection attempts fail with `reason`.
    pub fn refuse_connections(&self, reason: &str) {
        self.shared.lock().refuse = Some(reason.to_string());
    }

    /// Makes the next `try_receive` fail at the transport level.
    pub fn fail_next_receive(&self) {
        self.shared.lock().fail_receive = true;
    }

    /// Hangs up: sends fail and receives fail once the inbound queue drains.
    pub fn hang_up(&self) {
        self.shared.lock().peer_closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_flow_both_ways() {
        let (mut transport, peer) = LoopbackTransport::new();
        let mut session = transport.connect("loopback").unwrap();
        assert!(peer.is_connected());

        peer.inject(Bytes::from_static(b"in"));
        assert_eq!(
            transport.try_receive(&mut session).unwrap(),
            Some(Bytes::from_static(b"in"))
        );
        assert_eq!(transport.try_receive(&mut session).unwrap(), None);

        transport
            .try_send(&mut session, Bytes::from_static(b"out"))
            .unwrap();
        assert_eq!(peer.sent(), vec![Bytes::from_static(b"out")]);

        transport.close(session);
        assert!(!peer.is_connected());
    }

    #[test]
    fn test_echo_reflects_sends() {
        let (mut transport, peer) = LoopbackTransport::echo();
        let mut session = transport.connect("loopback").unwrap();
        assert_eq!(transport.ready(&mut session).unwrap(), 0);
        transport
            .try_send(&mut session, Bytes::from_static(b"ping"))
            .unwrap();
        assert_eq!(peer.pending_inbound(), 1);
        assert_eq!(transport.ready(&mut session).unwrap(), 1);
    }

    #[test]
    fn test_refused_connection() {
        let (mut transport, peer) = LoopbackTransport::new();
        peer.refuse_connections("no route");
        assert!(matches!(
            transport.connect("loopback"),
            Err(ConnectionError::ConnectFailed { .. })
        ));
    }

    #[test]
    fn test_hang_up_drains_then_fails() {
        let (mut transport, peer) = LoopbackTransport::new();
        let mut session = transport.connect("loopback").unwrap();
        peer.inject(Bytes::from_static(b"last"));
        peer.hang_up();
        assert_eq!(transport.ready(&mut session).unwrap(), 2);
        assert!(transport.try_receive(&mut session).unwrap().is_some());
        assert!(matches!(
            transport.try_receive(&mut session),
            Err(ConnectionError::PeerClosed)
        ));
    }
}
