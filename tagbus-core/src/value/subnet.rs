//! Dual-stack subnets: an address plus a prefix length bounded by its family.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;

use crate::error::{ParseError, RangeError};
use crate::value::Tag;

/// An IPv4 or IPv6 network. The address is kept exactly as given, host
/// bits included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subnet(IpNetwork);

impl Subnet {
    /// Largest prefix length allowed for the family of `addr`.
    pub fn max_prefix(addr: &IpAddr) -> u8 {
        match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    }

    pub fn new(addr: IpAddr, prefix: u32) -> Result<Self, RangeError> {
        let max = Self::max_prefix(&addr);
        let out_of_range = RangeError::PrefixLength { prefix, max };
        let prefix = u8::try_from(prefix).map_err(|_| out_of_range.clone())?;
        IpNetwork::new(addr, prefix)
            .map(Self)
            .map_err(|_| out_of_range)
    }

    pub fn addr(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn prefix(&self) -> u8 {
        self.0.prefix()
    }

    /// Network address with host bits cleared.
    pub fn network(&self) -> IpAddr {
        self.0.network()
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.0.contains(addr)
    }

    pub fn as_ipnetwork(&self) -> IpNetwork {
        self.0
    }
}

impl From<IpNetwork> for Subnet {
    fn from(net: IpNetwork) -> Self {
        Self(net)
    }
}

impl FromStr for Subnet {
    type Err = ParseError;

    /// Parses `"<addr>/<prefix>"` in either v4 or v6 notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::Invalid {
            tag: Tag::Subnet,
            text: s.to_string(),
        };
        let (addr, prefix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let prefix: u32 = prefix.parse().map_err(|_| invalid())?;
        Ok(Subnet::new(addr, prefix)?)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.prefix())
    }
}
