//! ## tagbus-wire::frame
//! Length-prefixed framing for stream transports.
//!
//! Each frame is a `u32` big-endian length followed by that many bytes of
//! event message. Message-oriented transports skip this layer.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

const LENGTH_FIELD: usize = 4;

/// Prepends the length field to one encoded message.
pub fn encode_frame(message: &[u8], max_frame_size: usize) -> Result<Bytes, FrameError> {
    if message.len() > max_frame_size || message.len() > u32::MAX as usize {
        return Err(FrameError::FrameTooLarge {
            len: message.len(),
            max: max_frame_size,
        });
    }
    let mut buf = BytesMut::with_capacity(LENGTH_FIELD + message.len());
    buf.put_u32(message.len() as u32);
    buf.put_slice(message);
    Ok(buf.freeze())
}

/// Splits complete frames off the front of a receive buffer.
#[derive(Debug, Copy, Clone)]
pub struct FrameParser {
    max_frame_size: usize,
}

impl FrameParser {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Returns the next complete message, or `None` if `buf` does not yet
    /// hold one. Consumed bytes are removed from `buf`.
    pub fn parse(&self, buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        if buf.len() < LENGTH_FIELD {
            return Ok(None);
        }
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if len > self.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                len,
                max: self.max_frame_size,
            });
        }
        if buf.len() < LENGTH_FIELD + len {
            buf.reserve(LENGTH_FIELD + len - buf.len());
            return Ok(None);
        }
        buf.advance(LENGTH_FIELD);
        Ok(Some(buf.split_to(len).freeze()))
    }

    /// Number of [`FrameParser::parse`] calls on `buf` that would return
    /// something other than `Ok(None)`. An oversized header counts once,
    /// since parsing stops there.
    pub fn ready(&self, buf: &[u8]) -> usize {
        let mut count = 0;
        let mut rest = buf;
        while rest.len() >= LENGTH_FIELD {
            let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
            if len > self.max_frame_size {
                return count + 1;
            }
            if rest.len() < LENGTH_FIELD + len {
                break;
            }
            rest = &rest[LENGTH_FIELD + len..];
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_frames_are_split() {
        let parser = FrameParser::new(1024);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encode_frame(b"abc", 1024).unwrap());
        buf.extend_from_slice(&encode_frame(b"", 1024).unwrap());
        buf.extend_from_slice(&encode_frame(b"xyz", 1024).unwrap());

        assert_eq!(parser.parse(&mut buf).unwrap().unwrap(), "abc");
        assert_eq!(parser.parse(&mut buf).unwrap().unwrap(), "");
        assert_eq!(parser.parse(&mut buf).unwrap().unwrap(), "xyz");
        assert_eq!(parser.parse(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits_for_more() {
        let parser = FrameParser::new(1024);
        let frame = encode_frame(b"hello", 1024).unwrap();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&frame[..2]);
        assert_eq!(parser.parse(&mut buf).unwrap(), None);
        buf.extend_from_slice(&frame[2..6]);
        assert_eq!(parser.parse(&mut buf).unwrap(), None);
        buf.extend_from_slice(&frame[6..]);
        assert_eq!(parser.parse(&mut buf).unwrap().unwrap(), "hello");
    }

    #[test]
    fn test_ready_counts_complete_frames() {
        let parser = FrameParser::new(8);
        let mut buf = BytesMut::new();
        assert_eq!(parser.ready(&buf), 0);

        buf.extend_from_slice(&encode_frame(b"ab", 8).unwrap());
        buf.extend_from_slice(&encode_frame(b"", 8).unwrap());
        buf.extend_from_slice(&encode_frame(b"cdef", 8).unwrap()[..5]);
        assert_eq!(parser.ready(&buf), 2);

        buf.truncate(buf.len() - 5);
        buf.put_u32(9);
        assert_eq!(parser.ready(&buf), 3);
        assert!(parser.parse(&mut buf).unwrap().is_some());
        assert!(parser.parse(&mut buf).unwrap().is_some());
        assert!(parser.parse(&mut buf).is_err());
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let parser = FrameParser::new(8);
        let mut buf = BytesMut::new();
        buf.put_u32(9);
        assert_eq!(
            parser.parse(&mut buf),
            Err(FrameError::FrameTooLarge { len: 9, max: 8 })
        );
        assert!(encode_frame(&[0u8; 9], 8).is_err());
    }
}
