//! Non-blocking TCP transport with length-prefixed frames.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

use tagbus_config::ConnectionConfig;
use tagbus_wire::{encode_frame, FrameParser};

use crate::error::ConnectionError;
use crate::transport::Transport;

/// Pending output is capped at this many maximum-size frames.
const WRITE_BUFFER_FRAMES: usize = 4;

pub struct TcpTransport {
    connect_timeout: Duration,
    max_frame_size: usize,
    read_chunk_size: usize,
    parser: FrameParser,
}

pub struct TcpSession {
    stream: TcpStream,
    peer: SocketAddr,
    read_buf: BytesMut,
    write_buf: BytesMut,
    eof: bool,
}

impl TcpSession {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Encoded bytes accepted but not yet written to the socket.
    pub fn pending_write(&self) -> usize {
        self.write_buf.len()
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::from_config(&ConnectionConfig::default())
    }
}

impl TcpTransport {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            max_frame_size: config.max_frame_size,
            read_chunk_size: config.read_chunk_size,
            parser: FrameParser::new(config.max_frame_size),
        }
    }

    fn write_limit(&self) -> usize {
        WRITE_BUFFER_FRAMES * (self.max_frame_size + 4)
    }

    /// Writes as much pending output as the socket takes without blocking.
    fn flush_pending(&self, session: &mut TcpSession) -> Result<(), ConnectionError> {
        while !session.write_buf.is_empty() {
            match session.stream.write(&session.write_buf) {
                Ok(0) => return Err(ConnectionError::PeerClosed),
                Ok(n) => session.write_buf.advance(n),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Moves bytes that have already arrived into the read buffer. Stops at
    /// `WouldBlock`, at end of stream, or once one maximum frame's worth has
    /// been read, so a fast sender cannot keep this call busy.
    fn fill(&self, session: &mut TcpSession) -> Result<(), ConnectionError> {
        if session.eof {
            return Ok(());
        }
        let budget = self.max_frame_size.max(self.read_chunk_size);
        let mut chunk = vec![0u8; self.read_chunk_size];
        let mut read = 0;
        while read < budget {
            match session.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!(peer = %session.peer, "Peer closed the stream");
                    session.eof = true;
                    break;
                }
                Ok(n) => {
                    trace!(bytes = n, "Read from socket");
                    session.read_buf.extend_from_slice(&chunk[..n]);
                    read += n;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl Transport for TcpTransport {
    type Session = TcpSession;

    fn connect(&mut self, endpoint: &str) -> Result<TcpSession, ConnectionError> {
        let failed = |reason: String| ConnectionError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason,
        };
        let addrs = endpoint
            .to_socket_addrs()
            .map_err(|e| failed(e.to_string()))?;

        let mut last_error = String::from("no addresses resolved");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nonblocking(true)?;
                    stream.set_nodelay(true)?;
                    debug!(%addr, "TCP session established");
                    return Ok(TcpSession {
                        stream,
                        peer: addr,
                        read_buf: BytesMut::with_capacity(self.read_chunk_size),
                        write_buf: BytesMut::new(),
                        eof: false,
                    });
                }
                Err(e) => {
                    debug!(%addr, error = %e, "TCP connect attempt failed");
                    last_error = e.to_string();
                }
            }
        }
        Err(failed(last_error))
    }

    fn try_send(&mut self, session: &mut TcpSession, message: Bytes) -> Result<(), ConnectionError> {
        let frame = encode_frame(&message, self.max_frame_size)?;
        self.flush_pending(session)?;
        let pending = session.write_buf.len();
        if pending > 0 && pending + frame.len() > self.write_limit() {
            return Err(ConnectionError::Backpressure { pending });
        }
        session.write_buf.extend_from_slice(&frame);
        self.flush_pending(session)
    }

    fn try_receive(&mut self, session: &mut TcpSession) -> Result<Option<Bytes>, ConnectionError> {
        self.flush_pending(session)?;
        if let Some(message) = self.parser.parse(&mut session.read_buf)? {
            return Ok(Some(message));
        }
        self.fill(session)?;
        if let Some(message) = self.parser.parse(&mut session.read_buf)? {
            return Ok(Some(message));
        }
        if session.eof {
            return Err(ConnectionError::PeerClosed);
        }
        Ok(None)
    }

    fn ready(&mut self, session: &mut TcpSession) -> Result<usize, ConnectionError> {
        self.flush_pending(session)?;
        self.fill(session)?;
        Ok(self.parser.ready(&session.read_buf) + usize::from(session.eof))
    }

    fn max_message_size(&self) -> Option<usize> {
        Some(self.max_frame_size)
    }

    fn close(&mut self, mut session: TcpSession) {
        let _ = self.flush_pending(&mut session);
        let _ = session.stream.shutdown(std::net::Shutdown::Both);
        debug!(peer = %session.peer, "TCP session closed");
    }
}
