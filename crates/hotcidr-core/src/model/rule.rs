//! Rule record and its field types
//!
//! The sentinel `"all"` is kept symbolic in every field that allows it. It is
//! only turned into a provider wildcard (or `0.0.0.0/0`) when an action is
//! executed, never when records are compared.

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel spelling shared by protocol and location
pub const ALL: &str = "all";

/// Traffic direction a rule applies to
///
/// Unrecognized spellings are preserved rather than rejected at load time;
/// executing a rule with one is a fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Direction {
    Inbound,
    Outbound,
    Unrecognized(String),
}

impl From<String> for Direction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "inbound" => Direction::Inbound,
            "outbound" => Direction::Outbound,
            _ => Direction::Unrecognized(value),
        }
    }
}

impl From<&str> for Direction {
    fn from(value: &str) -> Self {
        Direction::from(value.to_string())
    }
}

impl From<Direction> for String {
    fn from(value: Direction) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("inbound"),
            Direction::Outbound => f.write_str("outbound"),
            Direction::Unrecognized(other) => f.write_str(other),
        }
    }
}

/// YAML scalar that may be written as a string or a bare integer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Number(i64),
    Text(String),
}

/// IP protocol of a rule, or the `all` sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawScalar", into = "String")]
pub enum Protocol {
    All,
    Named(String),
}

impl From<RawScalar> for Protocol {
    fn from(value: RawScalar) -> Self {
        match value {
            RawScalar::Number(n) => Protocol::Named(n.to_string()),
            RawScalar::Text(text) => Protocol::from(text),
        }
    }
}

impl From<String> for Protocol {
    fn from(value: String) -> Self {
        if value == ALL {
            Protocol::All
        } else {
            Protocol::Named(value)
        }
    }
}

impl From<&str> for Protocol {
    fn from(value: &str) -> Self {
        Protocol::from(value.to_string())
    }
}

impl From<Protocol> for String {
    fn from(value: Protocol) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::All => f.write_str(ALL),
            Protocol::Named(name) => f.write_str(name),
        }
    }
}

/// Peer of a rule: a CIDR, a security group name, or the `all` sentinel
///
/// Whether a literal is a CIDR or a group name is decided at execution time
/// by [`Location::target`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Location {
    All,
    Literal(String),
}

/// Execution-time interpretation of a [`Location`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Cidr(String),
    Group(String),
}

/// CIDR reached by the `all` location
pub const ANY_CIDR: &str = "0.0.0.0/0";

impl Location {
    /// Resolve the location for execution.
    ///
    /// `all` becomes [`ANY_CIDR`]; a literal that parses as a network with an
    /// explicit prefix is a CIDR; anything else names a security group.
    pub fn target(&self) -> Target {
        match self {
            Location::All => Target::Cidr(ANY_CIDR.to_string()),
            Location::Literal(value) if is_cidr(value) => Target::Cidr(value.clone()),
            Location::Literal(value) => Target::Group(value.clone()),
        }
    }
}

/// True when `value` is an IPv4/IPv6 network written with a prefix length
pub fn is_cidr(value: &str) -> bool {
    value.contains('/') && value.parse::<IpNetwork>().is_ok()
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        if value == ALL {
            Location::All
        } else {
            Location::Literal(value)
        }
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Location::from(value.to_string())
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::All => f.write_str(ALL),
            Location::Literal(value) => f.write_str(value),
        }
    }
}

/// Inclusive port range; a rule without one covers all ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawScalar", into = "RawScalar")]
pub struct PortRange {
    pub from: i32,
    pub to: i32,
}

impl PortRange {
    pub fn new(from: i32, to: i32) -> Self {
        Self { from, to }
    }

    pub fn single(port: i32) -> Self {
        Self { from: port, to: port }
    }
}

impl TryFrom<RawScalar> for PortRange {
    type Error = String;

    fn try_from(value: RawScalar) -> Result<Self, Self::Error> {
        match value {
            RawScalar::Number(n) => i32::try_from(n)
                .map(PortRange::single)
                .map_err(|_| format!("port {} is out of range", n)),
            RawScalar::Text(text) => parse_port_range(&text),
        }
    }
}

fn parse_port_range(text: &str) -> Result<PortRange, String> {
    let text = text.trim();
    if let Ok(port) = text.parse::<i32>() {
        return Ok(PortRange::single(port));
    }
    // A leading '-' belongs to a negative number, not the separator.
    let split = text
        .get(1..)
        .and_then(|rest| rest.find('-'))
        .map(|i| i + 1)
        .ok_or_else(|| format!("invalid port range `{}`", text))?;
    let (from, to) = (&text[..split], &text[split + 1..]);
    let from = from
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid start port in `{}`", text))?;
    let to = to
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid end port in `{}`", text))?;
    Ok(PortRange::new(from, to))
}

impl From<PortRange> for RawScalar {
    fn from(value: PortRange) -> Self {
        if value.from == value.to {
            RawScalar::Number(i64::from(value.from))
        } else {
            RawScalar::Text(value.to_string())
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// A single firewall rule as declared in a snapshot
///
/// Every field is optional because records come from hand-written files and
/// from provider dumps alike. `description` is informational and does not
/// take part in rule identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<PortRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RuleRecord {
    pub fn new(direction: impl Into<Direction>) -> Self {
        Self {
            direction: Some(direction.into()),
            ..Self::default()
        }
    }

    pub fn inbound() -> Self {
        Self::new(Direction::Inbound)
    }

    pub fn outbound() -> Self {
        Self::new(Direction::Outbound)
    }

    pub fn with_protocol(mut self, protocol: impl Into<Protocol>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<Location>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_ports(mut self, from: i32, to: i32) -> Self {
        self.ports = Some(PortRange::new(from, to));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
