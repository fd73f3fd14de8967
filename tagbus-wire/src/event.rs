//! ## tagbus-wire::event
//! Event messages: a version byte, the event name and an ordered argument
//! list.
//!
//! ```text
//! u8 version | u16 name_len | name | u16 argc | value*
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tagbus_core::Value;

use crate::error::{DecodeError, EncodingError};
use crate::value::{encode_value, put_str16, Reader};

pub const WIRE_VERSION: u8 = 1;

/// Default upper bound on one encoded message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// A decoded inbound (or not yet encoded outbound) event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub name: String,
    pub args: Vec<Value>,
}

impl Event {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Encoder/decoder for event messages.
#[derive(Debug, Copy, Clone)]
pub struct EventCodec {
    max_message_size: usize,
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCodec {
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Serializes an event into an owned snapshot. Later changes to `args`
    /// cannot affect the returned bytes.
    pub fn encode(&self, name: &str, args: &[Value]) -> Result<Bytes, EncodingError> {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u8(WIRE_VERSION);
        put_str16(&mut buf, "event name", name)?;
        let argc = u16::try_from(args.len()).map_err(|_| EncodingError::TooLong {
            what: "argument list",
            len: args.len(),
            max: u16::MAX as usize,
        })?;
        buf.put_u16(argc);
        for arg in args {
            encode_value(&mut buf, arg)?;
        }
        if buf.len() > self.max_message_size {
            return Err(EncodingError::MessageTooLarge {
                size: buf.len(),
                max: self.max_message_size,
            });
        }
        Ok(buf.freeze())
    }

    pub fn encode_event(&self, event: &Event) -> Result<Bytes, EncodingError> {
        self.encode(&event.name, &event.args)
    }

    /// Parses one complete message. Trailing bytes are malformed input.
    pub fn decode(&self, data: Bytes) -> Result<Event, DecodeError> {
        let mut reader = Reader::new(data);
        let version = reader.u8()?;
        if version != WIRE_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let name = reader.str16("event name")?;
        let argc = reader.u16()? as usize;
        let mut args = Vec::with_capacity(argc.min(reader.remaining()));
        for _ in 0..argc {
            args.push(reader.value()?);
        }
        match reader.remaining() {
            0 => Ok(Event { name, args }),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagbus_core::{Protocol, Record, RecordType};

    #[test]
    fn test_atomic_event_roundtrip() {
        let codec = EventCodec::new();
        let args = vec![
            Value::Int(-10),
            Value::Count(2),
            Value::time(1_700_000_000.25),
            Value::interval(120.0),
            Value::Bool(false),
            Value::Double(1.5),
            Value::from("Servus"),
            Value::port(5555, Protocol::Tcp),
            Value::Addr("6.7.6.5".parse().unwrap()),
            Value::Subnet("192.168.0.0/16".parse().unwrap()),
            Value::Addr("2001:db8:85a3::8a2e:370:7334".parse().unwrap()),
            Value::Subnet("2001:db8:85a3::/48".parse().unwrap()),
        ];
        let bytes = codec.encode("test1", &args).unwrap();
        let event = codec.decode(bytes).unwrap();
        assert_eq!(event, Event::new("test1", args));
    }

    #[test]
    fn test_empty_argument_list() {
        let codec = EventCodec::new();
        let bytes = codec.encode("tick", &[]).unwrap();
        assert_eq!(&bytes[..], &[WIRE_VERSION, 0x00, 0x04, b't', b'i', b'c', b'k', 0x00, 0x00]);
        assert!(codec.decode(bytes).unwrap().args.is_empty());
    }

    #[test]
    fn test_encoded_bytes_are_a_snapshot() {
        let codec = EventCodec::new();
        let rt = RecordType::create(["a", "b"]).unwrap();
        let mut rec = Record::new(&rt);
        rec.set("a", 42i64).unwrap();
        let mut args = vec![Value::Record(rec.clone())];
        let bytes = codec.encode("test3", &args).unwrap();

        rec.set("b", "late").unwrap();
        args[0] = Value::Record(rec);

        let sent = codec.decode(bytes).unwrap();
        let Value::Record(sent) = &sent.args[0] else {
            panic!("expected record");
        };
        assert_eq!(sent.get("b").unwrap(), None);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let codec = EventCodec::new();
        let mut raw = codec.encode("e", &[]).unwrap().to_vec();
        raw[0] = 9;
        assert_eq!(
            codec.decode(Bytes::from(raw)),
            Err(DecodeError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn test_rejects_truncated_arguments() {
        let codec = EventCodec::new();
        let raw = codec.encode("e", &[Value::Count(3)]).unwrap();
        let truncated = raw.slice(..raw.len() - 1);
        assert!(matches!(
            codec.decode(truncated),
            Err(DecodeError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_enforces_message_size() {
        let codec = EventCodec::with_max_message_size(16);
        assert!(matches!(
            codec.encode("e", &[Value::from("a string well past sixteen bytes")]),
            Err(EncodingError::MessageTooLarge { max: 16, .. })
        ));
    }
}
