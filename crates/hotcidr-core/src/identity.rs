//! Canonical rule identity
//!
//! Two rules are "the same rule" when their direction, location, protocol and
//! port range are equal after normalization. Normalization maps an absent
//! field to `None` and keeps the `all` sentinel symbolic; nothing else about a
//! record (its description, its position in a file) participates.
//!
//! The derived `Ord` is the canonical ordering used wherever identities are
//! iterated, which makes rule diffs stable across runs.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::model::{Direction, Location, PortRange, Protocol, RuleRecord};

/// Comparable, hashable key of a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleIdentity {
    pub direction: Option<Direction>,
    pub location: Option<Location>,
    pub protocol: Option<Protocol>,
    pub ports: Option<PortRange>,
}

impl RuleIdentity {
    /// Build an identity from its four fields directly
    pub fn new(
        direction: Option<Direction>,
        location: Option<Location>,
        protocol: Option<Protocol>,
        ports: Option<PortRange>,
    ) -> Self {
        Self {
            direction,
            location,
            protocol,
            ports,
        }
    }

    /// Canonicalize a rule record
    pub fn of(rule: &RuleRecord) -> Self {
        Self {
            direction: rule.direction.clone(),
            location: rule.location.clone(),
            protocol: rule.protocol.clone(),
            ports: rule.ports,
        }
    }

    /// The set of identities for a group's rules; duplicates collapse
    pub fn set_of(rules: &[RuleRecord]) -> BTreeSet<RuleIdentity> {
        rules.iter().map(RuleIdentity::of).collect()
    }

    /// Rebuild a record carrying exactly this identity
    pub fn to_record(&self) -> RuleRecord {
        RuleRecord {
            direction: self.direction.clone(),
            protocol: self.protocol.clone(),
            location: self.location.clone(),
            ports: self.ports,
            description: None,
        }
    }
}

impl From<&RuleRecord> for RuleIdentity {
    fn from(rule: &RuleRecord) -> Self {
        RuleIdentity::of(rule)
    }
}

/// `(protocol, ports, location)`; absent protocol/location print as `-`,
/// absent ports as `all`
impl fmt::Display for RuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let protocol = self
            .protocol
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let ports = self
            .ports
            .map_or_else(|| "all".to_string(), |p| p.to_string());
        let location = self
            .location
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        write!(f, "({}, {}, {})", protocol, ports, location)
    }
}
