//! # tagbus Wire Codec
//!
//! Crate for encoding tagbus events and values into bytes and back.
//! The core crate defines what a value means; this crate decides how it is
//! laid out. Every value is tag-prefixed, so any message can be decoded
//! without knowing the handler's signature in advance.

pub mod error;
pub mod event;
pub mod frame;
pub mod value;

pub use error::{DecodeError, EncodingError, FrameError};
pub use event::{Event, EventCodec, DEFAULT_MAX_MESSAGE_SIZE, WIRE_VERSION};
pub use frame::{encode_frame, FrameParser};
pub use value::{decode_value, encode_value, MAX_DEPTH};

#[cfg(test)]
mod proptests {
    use bytes::BytesMut;
    use proptest::prelude::*;
    use tagbus_core::{Port, Protocol, Subnet, Value};

    use super::*;

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::Int),
            any::<u64>().prop_map(Value::Count),
            any::<f64>()
                .prop_filter("NaN never compares equal", |f| !f.is_nan())
                .prop_map(Value::time),
            (-1e9f64..1e9).prop_map(Value::interval),
            any::<bool>().prop_map(Value::Bool),
            any::<f64>()
                .prop_filter("NaN never compares equal", |f| !f.is_nan())
                .prop_map(Value::Double),
            ".*".prop_map(Value::String),
            (any::<u16>(), 0u8..20)
                .prop_map(|(n, p)| Value::Port(Port::new(n, Protocol::from_number(p)))),
            any::<std::net::IpAddr>().prop_map(Value::Addr),
            (any::<std::net::Ipv4Addr>(), 0u32..=32)
                .prop_map(|(a, p)| Value::Subnet(Subnet::new(a.into(), p).unwrap())),
            (any::<std::net::Ipv6Addr>(), 0u32..=128)
                .prop_map(|(a, p)| Value::Subnet(Subnet::new(a.into(), p).unwrap())),
        ]
    }

    proptest! {
        #[test]
        fn scalar_roundtrip(value in scalar()) {
            let mut buf = BytesMut::new();
            encode_value(&mut buf, &value).unwrap();
            prop_assert_eq!(decode_value(buf.freeze()).unwrap(), value);
        }

        #[test]
        fn event_roundtrip(name in "[a-z_]{1,16}", args in prop::collection::vec(scalar(), 0..8)) {
            let codec = EventCodec::new();
            let bytes = codec.encode(&name, &args).unwrap();
            prop_assert_eq!(codec.decode(bytes).unwrap(), Event::new(name, args));
        }

        #[test]
        fn garbage_never_panics(raw in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = EventCodec::new().decode(bytes::Bytes::from(raw));
        }
    }
}
