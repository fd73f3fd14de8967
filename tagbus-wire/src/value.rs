//! ## tagbus-wire::value
//! Type-tag-prefixed encoding of a single [`Value`].
//!
//! Every value starts with a one-byte tag. Multi-byte integers are big
//! endian; floating-point variants carry their exact bit pattern. Records
//! carry their field names and only the fields that are set, so a sparse
//! record arrives with exactly the same subset populated.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tagbus_core::{Interval, Port, Protocol, Record, RecordType, Subnet, Tag, Time, Value};

use crate::error::{DecodeError, EncodingError};

/// Maximum record nesting accepted in either direction.
pub const MAX_DEPTH: usize = 32;

const FAMILY_V4: u8 = 4;
const FAMILY_V6: u8 = 6;

pub fn tag_code(tag: Tag) -> u8 {
    match tag {
        Tag::Int => 0x01,
        Tag::Count => 0x02,
        Tag::Time => 0x03,
        Tag::Interval => 0x04,
        Tag::Bool => 0x05,
        Tag::Double => 0x06,
        Tag::String => 0x07,
        Tag::Port => 0x08,
        Tag::Addr => 0x09,
        Tag::Subnet => 0x0a,
        Tag::Record => 0x0b,
    }
}

pub fn tag_from_code(code: u8) -> Result<Tag, DecodeError> {
    Tag::ALL
        .into_iter()
        .find(|tag| tag_code(*tag) == code)
        .ok_or(DecodeError::UnknownTag(code))
}

fn length_prefix<T: TryFrom<usize>>(
    what: &'static str,
    len: usize,
    max: usize,
) -> Result<T, EncodingError> {
    T::try_from(len).map_err(|_| EncodingError::TooLong { what, len, max })
}

pub(crate) fn put_str16(
    buf: &mut BytesMut,
    what: &'static str,
    s: &str,
) -> Result<(), EncodingError> {
    let len: u16 = length_prefix(what, s.len(), u16::MAX as usize)?;
    buf.put_u16(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn put_addr(buf: &mut BytesMut, addr: &IpAddr) {
    match addr {
        IpAddr::V4(v4) => {
            buf.put_u8(FAMILY_V4);
            buf.put_slice(&v4.octets());
        }
        IpAddr::V6(v6) => {
            buf.put_u8(FAMILY_V6);
            buf.put_slice(&v6.octets());
        }
    }
}

/// Appends `value` to `buf`.
pub fn encode_value(buf: &mut BytesMut, value: &Value) -> Result<(), EncodingError> {
    encode_nested(buf, value, 0)
}

fn encode_nested(buf: &mut BytesMut, value: &Value, depth: usize) -> Result<(), EncodingError> {
    buf.put_u8(tag_code(value.tag()));
    match value {
        Value::Int(v) => buf.put_i64(*v),
        Value::Count(v) => buf.put_u64(*v),
        Value::Time(v) => buf.put_f64(v.as_secs()),
        Value::Interval(v) => buf.put_f64(v.as_secs()),
        Value::Bool(v) => buf.put_u8(u8::from(*v)),
        Value::Double(v) => buf.put_f64(*v),
        Value::String(v) => {
            let len: u32 = length_prefix("string", v.len(), u32::MAX as usize)?;
            buf.put_u32(len);
            buf.put_slice(v.as_bytes());
        }
        Value::Port(v) => {
            buf.put_u16(v.number());
            buf.put_u8(v.protocol().number());
        }
        Value::Addr(v) => put_addr(buf, v),
        Value::Subnet(v) => {
            put_addr(buf, &v.addr());
            buf.put_u8(v.prefix());
        }
        Value::Record(record) => {
            if depth >= MAX_DEPTH {
                return Err(EncodingError::NestingTooDeep(MAX_DEPTH));
            }
            encode_record(buf, record, depth + 1)?;
        }
    }
    Ok(())
}

fn encode_record(buf: &mut BytesMut, record: &Record, depth: usize) -> Result<(), EncodingError> {
    let fields = record.record_type().fields();
    let count: u16 = length_prefix("record field list", fields.len(), u16::MAX as usize)?;
    buf.put_u16(count);
    for name in fields {
        put_str16(buf, "record field name", name)?;
    }
    // Field count fits u16, so the present count does too.
    buf.put_u16(record.present_count() as u16);
    for (index, _, value) in record.present() {
        buf.put_u16(index as u16);
        encode_nested(buf, value, depth)?;
    }
    Ok(())
}

/// Bounds-checked reader over an inbound message.
pub(crate) struct Reader {
    buf: Bytes,
}

impl Reader {
    pub(crate) fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::InsufficientData {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn u16(&mut self) -> Result<u16, DecodeError> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        self.need(8)?;
        Ok(self.buf.get_i64())
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    fn f64(&mut self) -> Result<f64, DecodeError> {
        self.need(8)?;
        Ok(self.buf.get_f64())
    }

    fn bytes(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        self.need(len)?;
        Ok(self.buf.split_to(len))
    }

    fn string(&mut self, len: usize, what: &'static str) -> Result<String, DecodeError> {
        let raw = self.bytes(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8(what))
    }

    pub(crate) fn str16(&mut self, what: &'static str) -> Result<String, DecodeError> {
        let len = self.u16()? as usize;
        self.string(len, what)
    }

    fn addr(&mut self) -> Result<IpAddr, DecodeError> {
        match self.u8()? {
            FAMILY_V4 => {
                let mut octets = [0u8; 4];
                self.need(4)?;
                self.buf.copy_to_slice(&mut octets);
                Ok(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            FAMILY_V6 => {
                let mut octets = [0u8; 16];
                self.need(16)?;
                self.buf.copy_to_slice(&mut octets);
                Ok(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            other => Err(DecodeError::InvalidAddressFamily(other)),
        }
    }

    pub(crate) fn value(&mut self) -> Result<Value, DecodeError> {
        self.nested_value(0)
    }

    fn nested_value(&mut self, depth: usize) -> Result<Value, DecodeError> {
        let tag = tag_from_code(self.u8()?)?;
        let value = match tag {
            Tag::Int => Value::Int(self.i64()?),
            Tag::Count => Value::Count(self.u64()?),
            Tag::Time => Value::Time(Time::from_secs(self.f64()?)),
            Tag::Interval => Value::Interval(Interval::from_secs(self.f64()?)),
            Tag::Bool => match self.u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(DecodeError::InvalidBool(other)),
            },
            Tag::Double => Value::Double(self.f64()?),
            Tag::String => {
                let len = self.u32()? as usize;
                Value::String(self.string(len, "string value")?)
            }
            Tag::Port => {
                let number = self.u16()?;
                Value::Port(Port::new(number, Protocol::from_number(self.u8()?)))
            }
            Tag::Addr => Value::Addr(self.addr()?),
            Tag::Subnet => {
                let addr = self.addr()?;
                let prefix = self.u8()?;
                let subnet =
                    Subnet::new(addr, u32::from(prefix)).map_err(|_| DecodeError::InvalidPrefix {
                        prefix,
                        family: if addr.is_ipv4() { FAMILY_V4 } else { FAMILY_V6 },
                    })?;
                Value::Subnet(subnet)
            }
            Tag::Record => {
                if depth >= MAX_DEPTH {
                    return Err(DecodeError::NestingTooDeep(MAX_DEPTH));
                }
                Value::Record(self.record(depth + 1)?)
            }
        };
        Ok(value)
    }

    fn record(&mut self, depth: usize) -> Result<Record, DecodeError> {
        let field_count = self.u16()? as usize;
        let mut names = Vec::with_capacity(field_count.min(self.remaining()));
        for _ in 0..field_count {
            names.push(self.str16("record field name")?);
        }
        let record_type = RecordType::create(names)?;
        let mut record = Record::new(&record_type);

        let present = self.u16()? as usize;
        if present > field_count {
            return Err(DecodeError::FieldIndex {
                index: present,
                fields: field_count,
            });
        }
        for _ in 0..present {
            let index = self.u16()? as usize;
            if index >= field_count {
                return Err(DecodeError::FieldIndex {
                    index,
                    fields: field_count,
                });
            }
            let value = self.nested_value(depth)?;
            if record.set_at(index, value)?.is_some() {
                return Err(DecodeError::RepeatedField(index));
            }
        }
        Ok(record)
    }
}

/// Decodes exactly one value from `buf`; trailing bytes are an error.
pub fn decode_value(buf: Bytes) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(buf);
    let value = reader.value()?;
    match reader.remaining() {
        0 => Ok(value),
        n => Err(DecodeError::TrailingBytes(n)),
    }
}
