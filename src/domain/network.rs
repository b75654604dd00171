// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("CIDR has host bits set: {given} (network address is {canonical})")]
    NonCanonicalCidr { given: String, canonical: String },

    #[error("Fault domain label is empty")]
    EmptyFaultDomain,

    #[error("Invalid character in fault domain label: {0}")]
    InvalidFaultDomain(String),

    #[error("Invalid port range: {0}")]
    InvalidPortRange(String),
}

/// Address range in CIDR notation
///
/// Wraps an IPv4 or IPv6 network.
/// Invariants:
/// - Valid CIDR notation with an explicit prefix length
/// - Canonical: no host bits set (`10.0.1.0/24`, not `10.0.1.7/24`)
///
/// # Examples
///
/// ```rust
/// use cim_topology::domain::Cidr;
///
/// let network = Cidr::new("10.0.0.0/16").unwrap();
/// let subnet = Cidr::new("10.0.1.0/24").unwrap();
/// assert!(network.contains(&subnet));
/// assert!(Cidr::new("10.0.1.7/24").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr(IpNetwork);

impl Cidr {
    /// Create a new CIDR block with validation
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();

        if !cidr.contains('/') {
            return Err(NetworkError::InvalidCidr(cidr.to_string()));
        }

        let network =
            IpNetwork::from_str(cidr).map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        // Invariant: address must be the network address
        if network.ip() != network.network() {
            return Err(NetworkError::NonCanonicalCidr {
                given: cidr.to_string(),
                canonical: format!("{}/{}", network.network(), network.prefix()),
            });
        }

        Ok(Self(network))
    }

    /// Get the network address
    pub fn network_address(&self) -> IpAddr {
        self.0.network()
    }

    /// Get the prefix length
    pub fn prefix(&self) -> u8 {
        self.0.prefix()
    }

    pub fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }

    /// Check whether this block is a default route (`0.0.0.0/0` or `::/0`)
    pub fn is_default_route(&self) -> bool {
        self.prefix() == 0
    }

    /// Check whether `other` lies entirely within this block
    pub fn contains(&self, other: &Cidr) -> bool {
        self.prefix() <= other.prefix() && self.0.contains(other.network_address())
    }

    /// Check whether the two blocks share any address
    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.0.contains(other.network_address()) || other.0.contains(self.network_address())
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        format!("{}/{}", self.network_address(), self.prefix())
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.as_cidr()
    }
}

/// Fault domain label (availability zone)
///
/// Invariants:
/// - Non-empty
/// - ASCII alphanumerics and hyphens only
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FaultDomain(String);

impl FaultDomain {
    pub fn new(label: impl Into<String>) -> Result<Self, NetworkError> {
        let label = label.into();

        if label.is_empty() {
            return Err(NetworkError::EmptyFaultDomain);
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(NetworkError::InvalidFaultDomain(label));
        }

        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FaultDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FaultDomain {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FaultDomain {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FaultDomain> for String {
    fn from(domain: FaultDomain) -> Self {
        domain.0
    }
}

/// Raw port range as written in a snapshot: `80` or `"1024-65535"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortRangeRepr {
    Single(u16),
    Text(String),
}

/// Inclusive port range
///
/// Invariants:
/// - `from <= to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PortRangeRepr", into = "String")]
pub struct PortRange {
    from: u16,
    to: u16,
}

impl PortRange {
    /// Every port
    pub const ALL: PortRange = PortRange { from: 0, to: u16::MAX };

    pub fn new(from: u16, to: u16) -> Result<Self, NetworkError> {
        if from > to {
            return Err(NetworkError::InvalidPortRange(format!("{}-{}", from, to)));
        }
        Ok(Self { from, to })
    }

    /// A range covering exactly one port
    pub fn single(port: u16) -> Self {
        Self { from: port, to: port }
    }

    pub fn from_port(&self) -> u16 {
        self.from
    }

    pub fn to_port(&self) -> u16 {
        self.to
    }

    pub fn contains(&self, port: u16) -> bool {
        self.from <= port && port <= self.to
    }

    pub fn is_single(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

impl FromStr for PortRange {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NetworkError::InvalidPortRange(s.to_string());
        match s.split_once('-') {
            Some((from, to)) => {
                let from = from.trim().parse().map_err(|_| invalid())?;
                let to = to.trim().parse().map_err(|_| invalid())?;
                Self::new(from, to)
            }
            None => s.trim().parse().map(Self::single).map_err(|_| invalid()),
        }
    }
}

impl TryFrom<PortRangeRepr> for PortRange {
    type Error = NetworkError;

    fn try_from(value: PortRangeRepr) -> Result<Self, Self::Error> {
        match value {
            PortRangeRepr::Single(port) => Ok(Self::single(port)),
            PortRangeRepr::Text(text) => text.parse(),
        }
    }
}

impl From<PortRange> for String {
    fn from(range: PortRange) -> Self {
        range.to_string()
    }
}

/// Transport protocol of a firewall rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    /// Any protocol (`-1` in provider notation)
    #[serde(alias = "-1")]
    All,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
            Self::All => "all",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cidr() {
        let cidr = Cidr::new("10.0.0.0/16").unwrap();
        assert_eq!(cidr.prefix(), 16);
        assert!(cidr.is_ipv4());
        assert_eq!(cidr.as_cidr(), "10.0.0.0/16");
        assert!(!cidr.is_default_route());
        assert!(Cidr::new("0.0.0.0/0").unwrap().is_default_route());
        assert!(Cidr::new("::/0").unwrap().is_default_route());
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(Cidr::new("10.0.0.0").is_err()); // No prefix
        assert!(Cidr::new("10.0.0.0/33").is_err());
        assert!(Cidr::new("999.0.0.0/8").is_err());
        assert_eq!(
            Cidr::new("10.0.1.7/24"),
            Err(NetworkError::NonCanonicalCidr {
                given: "10.0.1.7/24".to_string(),
                canonical: "10.0.1.0/24".to_string(),
            })
        );
    }

    #[test]
    fn test_cidr_containment() {
        let network = Cidr::new("10.0.0.0/16").unwrap();
        let inside = Cidr::new("10.0.2.0/24").unwrap();
        let outside = Cidr::new("10.1.0.0/24").unwrap();
        let wider = Cidr::new("10.0.0.0/8").unwrap();

        assert!(network.contains(&inside));
        assert!(network.contains(&network));
        assert!(!network.contains(&outside));
        assert!(!network.contains(&wider));
    }

    #[test]
    fn test_cidr_overlap() {
        let a = Cidr::new("10.0.1.0/24").unwrap();
        let b = Cidr::new("10.0.2.0/24").unwrap();
        let c = Cidr::new("10.0.0.0/22").unwrap();
        let v6 = Cidr::new("2001:db8::/32").unwrap();

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
        assert!(!a.overlaps(&v6));
    }

    #[test]
    fn test_fault_domain() {
        assert!(FaultDomain::new("us-east-1a").is_ok());
        assert_eq!(FaultDomain::new(""), Err(NetworkError::EmptyFaultDomain));
        assert!(FaultDomain::new("us east").is_err());
    }

    #[test]
    fn test_port_range() {
        let range: PortRange = "1024-65535".parse().unwrap();
        assert!(range.contains(8080));
        assert!(!range.contains(80));
        assert_eq!(range.to_string(), "1024-65535");

        let single: PortRange = "80".parse().unwrap();
        assert!(single.is_single());
        assert_eq!(single, PortRange::single(80));

        assert!("443-80".parse::<PortRange>().is_err());
        assert!("http".parse::<PortRange>().is_err());
        assert!(PortRange::ALL.contains(0));
    }

    #[test]
    fn test_port_range_serde() {
        let single: PortRange = serde_json::from_str("80").unwrap();
        assert_eq!(single, PortRange::single(80));

        let range: PortRange = serde_json::from_str("\"0-65535\"").unwrap();
        assert_eq!(range, PortRange::ALL);

        assert_eq!(serde_json::to_string(&single).unwrap(), "\"80\"");
    }

    #[test]
    fn test_protocol_alias() {
        let all: Protocol = serde_json::from_str("\"-1\"").unwrap();
        assert_eq!(all, Protocol::All);
        let tcp: Protocol = serde_json::from_str("\"tcp\"").unwrap();
        assert_eq!(tcp, Protocol::Tcp);
    }
}
