//! ## tagbus-core::value
//! **Closed tagged union of every wire-transmissible type**
//!
//! A [`Value`]'s [`Tag`] fully determines which accessor is valid. Reading
//! a value as a different variant yields `None` (or [`TypeMismatch`] for
//! `TryFrom`), never a silent conversion: an `Int` is not a `Count`.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{ParseError, RangeError, TypeMismatch};
use crate::record::Record;

mod port;
mod subnet;
mod time;

pub use port::{Port, Protocol};
pub use subnet::Subnet;
pub use time::{Interval, Time};

/// Discriminant of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Int,
    Count,
    Time,
    Interval,
    Bool,
    Double,
    String,
    Port,
    Addr,
    Subnet,
    Record,
}

impl Tag {
    pub const ALL: [Tag; 11] = [
        Tag::Int,
        Tag::Count,
        Tag::Time,
        Tag::Interval,
        Tag::Bool,
        Tag::Double,
        Tag::String,
        Tag::Port,
        Tag::Addr,
        Tag::Subnet,
        Tag::Record,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Int => "int",
            Tag::Count => "count",
            Tag::Time => "time",
            Tag::Interval => "interval",
            Tag::Bool => "bool",
            Tag::Double => "double",
            Tag::String => "string",
            Tag::Port => "port",
            Tag::Addr => "addr",
            Tag::Subnet => "subnet",
            Tag::Record => "record",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownTag(s.to_string()))
    }
}

/// A single typed value as exchanged between peers.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Count(u64),
    Time(Time),
    Interval(Interval),
    Bool(bool),
    Double(f64),
    String(String),
    Port(Port),
    Addr(IpAddr),
    Subnet(Subnet),
    Record(Record),
}

impl Value {
    pub fn tag(&self) -> Tag {
        match self {
            Value::Int(_) => Tag::Int,
            Value::Count(_) => Tag::Count,
            Value::Time(_) => Tag::Time,
            Value::Interval(_) => Tag::Interval,
            Value::Bool(_) => Tag::Bool,
            Value::Double(_) => Tag::Double,
            Value::String(_) => Tag::String,
            Value::Port(_) => Tag::Port,
            Value::Addr(_) => Tag::Addr,
            Value::Subnet(_) => Tag::Subnet,
            Value::Record(_) => Tag::Record,
        }
    }

    /// Builds a count from a signed integer, rejecting negatives.
    pub fn count(n: i64) -> Result<Self, RangeError> {
        u64::try_from(n)
            .map(Value::Count)
            .map_err(|_| RangeError::NegativeCount(n))
    }

    pub fn time(secs: f64) -> Self {
        Value::Time(Time::from_secs(secs))
    }

    pub fn interval(secs: f64) -> Self {
        Value::Interval(Interval::from_secs(secs))
    }

    pub fn port(number: u16, protocol: Protocol) -> Self {
        Value::Port(Port::new(number, protocol))
    }

    pub fn subnet(addr: IpAddr, prefix: u32) -> Result<Self, RangeError> {
        Subnet::new(addr, prefix).map(Value::Subnet)
    }

    /// Parses the textual form of a scalar of type `tag`.
    ///
    /// Records have no textual form and fail with [`ParseError::NotParsable`].
    pub fn parse(tag: Tag, text: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::Invalid {
            tag,
            text: text.to_string(),
        };
        let trimmed = text.trim();
        let value = match tag {
            Tag::Int => Value::Int(trimmed.parse().map_err(|_| invalid())?),
            Tag::Count => {
                let n: i64 = trimmed.parse().map_err(|_| invalid())?;
                Value::count(n)?
            }
            Tag::Time => Value::time(trimmed.parse().map_err(|_| invalid())?),
            Tag::Interval => Value::interval(trimmed.parse().map_err(|_| invalid())?),
            Tag::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "t" | "true" | "1" => Value::Bool(true),
                "f" | "false" | "0" => Value::Bool(false),
                _ => return Err(invalid()),
            },
            Tag::Double => Value::Double(trimmed.parse().map_err(|_| invalid())?),
            Tag::String => Value::String(text.to_string()),
            Tag::Port => Value::Port(trimmed.parse()?),
            Tag::Addr => Value::Addr(trimmed.parse().map_err(|_| invalid())?),
            Tag::Subnet => Value::Subnet(trimmed.parse()?),
            Tag::Record => return Err(ParseError::NotParsable(tag)),
        };
        Ok(value)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Value::Count(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<Time> {
        match self {
            Value::Time(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_interval(&self) -> Option<Interval> {
        match self {
            Value::Interval(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_port(&self) -> Option<Port> {
        match self {
            Value::Port(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_addr(&self) -> Option<IpAddr> {
        match self {
            Value::Addr(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_subnet(&self) -> Option<Subnet> {
        match self {
            Value::Subnet(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Count(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::Interval(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Port(v) => write!(f, "{v}"),
            Value::Addr(v) => write!(f, "{v}"),
            Value::Subnet(v) => write!(f, "{v}"),
            Value::Record(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! native_conversions {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$native> for Value {
                fn from(v: $native) -> Self {
                    Value::$variant(v)
                }
            }

            impl TryFrom<Value> for $native {
                type Error = TypeMismatch;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(TypeMismatch {
                            expected: Tag::$variant,
                            actual: other.tag(),
                        }),
                    }
                }
            }
        )*
    };
}

native_conversions! {
    i64 => Int,
    u64 => Count,
    Time => Time,
    Interval => Interval,
    bool => Bool,
    f64 => Double,
    String => String,
    Port => Port,
    IpAddr => Addr,
    Subnet => Subnet,
    Record => Record,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_rejects_negative() {
        assert_eq!(Value::count(0).unwrap(), Value::Count(0));
        assert!(matches!(
            Value::count(-1),
            Err(RangeError::NegativeCount(-1))
        ));
    }

    #[test]
    fn accessors_match_only_their_tag() {
        let v = Value::Int(3);
        assert_eq!(v.as_int(), Some(3));
        assert_eq!(v.as_count(), None);
        assert_eq!(v.as_double(), None);
        assert_eq!(Value::Count(3).as_int(), None);
    }

    #[test]
    fn try_from_reports_mismatch() {
        let err = u64::try_from(Value::Int(3)).unwrap_err();
        assert_eq!(err.expected, Tag::Count);
        assert_eq!(err.actual, Tag::Int);
        assert_eq!(i64::try_from(Value::Int(-10)).unwrap(), -10);
    }

    #[test]
    fn parses_every_scalar_tag() {
        assert_eq!(Value::parse(Tag::Int, "-10").unwrap(), Value::Int(-10));
        assert_eq!(Value::parse(Tag::Count, "2").unwrap(), Value::Count(2));
        assert_eq!(Value::parse(Tag::Time, "1.5").unwrap(), Value::time(1.5));
        assert_eq!(
            Value::parse(Tag::Interval, "120").unwrap(),
            Value::interval(120.0)
        );
        assert_eq!(Value::parse(Tag::Bool, "F").unwrap(), Value::Bool(false));
        assert_eq!(Value::parse(Tag::Double, "1.5").unwrap(), Value::Double(1.5));
        assert_eq!(
            Value::parse(Tag::String, "Servus").unwrap(),
            Value::from("Servus")
        );
        assert_eq!(
            Value::parse(Tag::Port, "5555/tcp").unwrap(),
            Value::port(5555, Protocol::Tcp)
        );
        assert_eq!(
            Value::parse(Tag::Addr, "2001:db8:85a3::8a2e:370:7334")
                .unwrap()
                .to_string(),
            "2001:db8:85a3::8a2e:370:7334"
        );
        assert_eq!(
            Value::parse(Tag::Subnet, "192.168.0.0/16")
                .unwrap()
                .to_string(),
            "192.168.0.0/16"
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            Value::parse(Tag::Count, "-3"),
            Err(ParseError::Range(RangeError::NegativeCount(-3)))
        ));
        assert!(Value::parse(Tag::Bool, "maybe").is_err());
        assert!(Value::parse(Tag::Addr, "6.7.6").is_err());
        assert!(matches!(
            Value::parse(Tag::Record, "x"),
            Err(ParseError::NotParsable(Tag::Record))
        ));
    }

    #[test]
    fn tag_names_roundtrip() {
        for tag in Tag::ALL {
            assert_eq!(tag.as_str().parse::<Tag>().unwrap(), tag);
        }
        assert!("vector".parse::<Tag>().is_err());
    }

    #[test]
    fn integer_and_count_are_distinct() {
        assert_ne!(Value::Int(3), Value::Count(3));
        assert_ne!(Value::Int(3).tag(), Value::Count(3).tag());
    }
}
