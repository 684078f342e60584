//! Connector capability: the narrow interface actions mutate live state through
//!
//! A connector is a single stateful provider session owned by the executor
//! for one run. Retry/backoff of network failures, if any, belongs inside a
//! connector implementation; the core calls each operation exactly once
//! (apart from the group-reference parameter fallback described on
//! [`GroupParameter`]).

pub mod memory;

pub use memory::{ConnectorCall, ConnectorOp, MemoryCloud};

use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::errors::HotCidrError;

/// Provider wildcard for "every protocol"
pub const WILDCARD_PROTOCOL: &str = "-1";

/// Provider wildcard for "every port" (used for both ends of the range)
pub const WILDCARD_PORT: i32 = -1;

/// Instance attribute holding the set of attached group ids
pub const GROUP_SET_ATTRIBUTE: &str = "groupSet";

/// Failure reported by a connector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The provider does not accept this parameter for this call.
    /// The only failure the core recovers from.
    #[error("unsupported parameter: {parameter}")]
    UnsupportedParameter { parameter: String },

    /// Any other provider-side failure
    #[error("{code}: {message}")]
    Provider { code: String, message: String },
}

impl ConnectorError {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::Provider {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Lift into the domain error, tagging the failed operation
    pub fn into_domain(self, op: &str) -> HotCidrError {
        match self {
            ConnectorError::UnsupportedParameter { parameter } => {
                HotCidrError::UnsupportedParameter {
                    op: op.to_string(),
                    parameter,
                }
            }
            ConnectorError::Provider { code, message } => HotCidrError::Connector {
                op: op.to_string(),
                code,
                message,
            },
        }
    }
}

/// Parameter identity under which a group-reference peer is passed
///
/// Providers name the peer-group parameter differently depending on the call
/// (ingress vs. egress). Callers pass [`GroupParameter::PRIMARY`] first and
/// fall back to [`GroupParameter::alternate`] only when the connector answers
/// with [`ConnectorError::UnsupportedParameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GroupParameter {
    SourceGroupId,
    SourceSecurityGroupGroupId,
}

impl GroupParameter {
    pub const PRIMARY: GroupParameter = GroupParameter::SourceGroupId;

    pub fn alternate(self) -> GroupParameter {
        match self {
            GroupParameter::SourceGroupId => GroupParameter::SourceSecurityGroupGroupId,
            GroupParameter::SourceSecurityGroupGroupId => GroupParameter::SourceGroupId,
        }
    }

    /// Wire name of the parameter
    pub fn name(self) -> &'static str {
        match self {
            GroupParameter::SourceGroupId => "src_group_id",
            GroupParameter::SourceSecurityGroupGroupId => "src_security_group_group_id",
        }
    }
}

/// Peer of a rule call: exactly one of a CIDR or a group reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Destination {
    Cidr(String),
    Group {
        group_id: String,
        parameter: GroupParameter,
    },
}

/// Fully resolved arguments of one authorize/revoke call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RuleRequest {
    pub group_id: String,
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub destination: Destination,
}

impl RuleRequest {
    /// Same request with the group-reference parameter swapped; CIDR
    /// destinations are returned unchanged
    pub fn with_alternate_parameter(&self) -> RuleRequest {
        let mut request = self.clone();
        if let Destination::Group { parameter, .. } = &mut request.destination {
            *parameter = parameter.alternate();
        }
        request
    }
}

/// Capability the executor mutates live state through
pub trait Connector {
    /// Create a security group.
    ///
    /// # Errors
    ///
    /// Provider failure (e.g. the name is taken).
    fn create_security_group(&mut self, name: &str, description: &str)
        -> Result<(), ConnectorError>;

    /// Set an instance attribute; the core only sets [`GROUP_SET_ATTRIBUTE`].
    ///
    /// # Errors
    ///
    /// Provider failure (unknown instance, unsupported attribute).
    fn set_instance_attribute(
        &mut self,
        instance_id: &str,
        attribute: &str,
        value: &BTreeSet<String>,
    ) -> Result<(), ConnectorError>;

    /// # Errors
    ///
    /// `UnsupportedParameter` for a rejected group parameter, otherwise provider failure.
    fn authorize_ingress(&mut self, request: &RuleRequest) -> Result<(), ConnectorError>;

    /// # Errors
    ///
    /// `UnsupportedParameter` for a rejected group parameter, otherwise provider failure.
    fn revoke_ingress(&mut self, request: &RuleRequest) -> Result<(), ConnectorError>;

    /// # Errors
    ///
    /// `UnsupportedParameter` for a rejected group parameter, otherwise provider failure.
    fn authorize_egress(&mut self, request: &RuleRequest) -> Result<(), ConnectorError>;

    /// # Errors
    ///
    /// `UnsupportedParameter` for a rejected group parameter, otherwise provider failure.
    fn revoke_egress(&mut self, request: &RuleRequest) -> Result<(), ConnectorError>;

    /// Provider ids of every group with this name; empty when unknown.
    ///
    /// # Errors
    ///
    /// Provider failure while listing groups.
    fn security_group_ids(&self, name: &str) -> Result<Vec<String>, ConnectorError>;
}
