//! Transport-layer port values (`5555/tcp`).

use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, RangeError};
use crate::value::Tag;

/// Transport protocol attached to a port.
///
/// Tokens that are not recognised locally parse to `Unknown` instead of
/// failing, since a peer may use protocols this side does not know.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Unknown,
}

impl Protocol {
    /// IANA protocol number used on the wire. `Unknown` maps to 0.
    pub fn number(self) -> u8 {
        match self {
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Icmp => 1,
            Protocol::Unknown => 0,
        }
    }

    pub fn from_number(number: u8) -> Self {
        match number {
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            1 => Protocol::Icmp,
            _ => Protocol::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Unknown => "unknown",
        }
    }
}

impl From<&str> for Protocol {
    fn from(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            "icmp" => Protocol::Icmp,
            _ => Protocol::Unknown,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A port number qualified by its transport protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Port {
    number: u16,
    protocol: Protocol,
}

impl Port {
    pub fn new(number: u16, protocol: Protocol) -> Self {
        Self { number, protocol }
    }

    /// Builds a port from a wider integer, rejecting numbers above 65535.
    pub fn try_new(number: u64, protocol: Protocol) -> Result<Self, RangeError> {
        let number = u16::try_from(number).map_err(|_| RangeError::PortNumber(number))?;
        Ok(Self::new(number, protocol))
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl FromStr for Port {
    type Err = ParseError;

    /// Parses `"<number>/<proto>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::Invalid {
            tag: Tag::Port,
            text: s.to_string(),
        };
        let (number, proto) = s.trim().split_once('/').ok_or_else(invalid)?;
        let number: u64 = number.parse().map_err(|_| invalid())?;
        if proto.is_empty() {
            return Err(invalid());
        }
        Ok(Port::try_new(number, Protocol::from(proto))?)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.protocol)
    }
}
