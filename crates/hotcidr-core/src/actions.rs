//! Convergence actions
//!
//! An [`Action`] is one unit of work produced by the diff engine. The set of
//! kinds is closed. Each action can describe itself for progress output and
//! apply itself against a [`Connector`].
//!
//! Resolution that depends on live state happens in [`Action::apply`], not
//! in the diff: `all` protocol and missing ports become provider wildcards,
//! the `all` location becomes `0.0.0.0/0`, and group-name locations are
//! looked up on the connector and fanned out to one call per matching id.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::connector::{
    Connector, ConnectorError, Destination, GroupParameter, RuleRequest, GROUP_SET_ATTRIBUTE,
    WILDCARD_PORT, WILDCARD_PROTOCOL,
};
use crate::errors::{HotCidrError, Result};
use crate::identity::RuleIdentity;
use crate::model::{Direction, Protocol, Target};

/// One unit of convergence work
///
/// Equality and hashing are structural over every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Create a security group that exists only in desired state
    CreateGroup { name: String, description: String },

    /// Replace an instance's attached groups with these provider ids
    SetInstanceGroups {
        instance_id: String,
        group_ids: BTreeSet<String>,
    },

    /// Authorize a rule on a group
    AddRule { group: String, rule: RuleIdentity },

    /// Revoke a rule from a group
    RemoveRule { group: String, rule: RuleIdentity },
}

/// Discriminant of [`Action`], used for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateGroup,
    SetInstanceGroups,
    AddRule,
    RemoveRule,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateGroup { .. } => ActionKind::CreateGroup,
            Action::SetInstanceGroups { .. } => ActionKind::SetInstanceGroups,
            Action::AddRule { .. } => ActionKind::AddRule,
            Action::RemoveRule { .. } => ActionKind::RemoveRule,
        }
    }

    /// Human-readable intent, as shown in progress output
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Execute the action against a connector.
    ///
    /// # Errors
    ///
    /// - `InvalidDirection` / `InvalidRule` before any connector call when a
    ///   rule cannot be executed
    /// - `UnsupportedParameter` when both group-reference parameters are rejected
    /// - `Connector` for any other connector failure
    pub fn apply(&self, connector: &mut dyn Connector) -> Result<()> {
        match self {
            Action::CreateGroup { name, description } => connector
                .create_security_group(name, description)
                .map_err(|e| e.into_domain("create_security_group")),
            Action::SetInstanceGroups {
                instance_id,
                group_ids,
            } => connector
                .set_instance_attribute(instance_id, GROUP_SET_ATTRIBUTE, group_ids)
                .map_err(|e| e.into_domain("set_instance_attribute")),
            Action::AddRule { group, rule } => {
                modify_rule(connector, group, rule, RuleChange::Authorize)
            }
            Action::RemoveRule { group, rule } => {
                modify_rule(connector, group, rule, RuleChange::Revoke)
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateGroup { name, description } => {
                write!(f, "Create new security group {} ({})", name, description)
            }
            Action::SetInstanceGroups {
                instance_id,
                group_ids,
            } => {
                let ids: Vec<&str> = group_ids.iter().map(String::as_str).collect();
                write!(
                    f,
                    "Set {} of {} to {{{}}}",
                    GROUP_SET_ATTRIBUTE,
                    instance_id,
                    ids.join(", ")
                )
            }
            Action::AddRule { group, rule } => write!(f, "Add rule {} to {}", rule, group),
            Action::RemoveRule { group, rule } => write!(f, "Del rule {} from {}", rule, group),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RuleChange {
    Authorize,
    Revoke,
}

#[derive(Debug, Clone, Copy)]
enum Flow {
    Ingress,
    Egress,
}

fn op_name(change: RuleChange, flow: Flow) -> &'static str {
    match (change, flow) {
        (RuleChange::Authorize, Flow::Ingress) => "authorize_ingress",
        (RuleChange::Revoke, Flow::Ingress) => "revoke_ingress",
        (RuleChange::Authorize, Flow::Egress) => "authorize_egress",
        (RuleChange::Revoke, Flow::Egress) => "revoke_egress",
    }
}

fn issue(
    connector: &mut dyn Connector,
    change: RuleChange,
    flow: Flow,
    request: &RuleRequest,
) -> std::result::Result<(), ConnectorError> {
    match (change, flow) {
        (RuleChange::Authorize, Flow::Ingress) => connector.authorize_ingress(request),
        (RuleChange::Revoke, Flow::Ingress) => connector.revoke_ingress(request),
        (RuleChange::Authorize, Flow::Egress) => connector.authorize_egress(request),
        (RuleChange::Revoke, Flow::Egress) => connector.revoke_egress(request),
    }
}

/// Issue a call, retrying once with the alternate group parameter when the
/// connector rejects the primary one as unsupported
fn issue_with_fallback(
    connector: &mut dyn Connector,
    change: RuleChange,
    flow: Flow,
    request: &RuleRequest,
) -> std::result::Result<(), ConnectorError> {
    match issue(connector, change, flow, request) {
        Err(ConnectorError::UnsupportedParameter { parameter })
            if matches!(request.destination, Destination::Group { .. }) =>
        {
            tracing::debug!(
                op = op_name(change, flow),
                rejected = %parameter,
                "retrying with alternate group parameter"
            );
            issue(connector, change, flow, &request.with_alternate_parameter())
        }
        other => other,
    }
}

fn lookup_group_ids(connector: &dyn Connector, name: &str) -> Result<Vec<String>> {
    connector
        .security_group_ids(name)
        .map_err(|e| e.into_domain("security_group_ids"))
}

fn modify_rule(
    connector: &mut dyn Connector,
    group: &str,
    rule: &RuleIdentity,
    change: RuleChange,
) -> Result<()> {
    let flow = match &rule.direction {
        Some(Direction::Inbound) => Flow::Ingress,
        Some(Direction::Outbound) => Flow::Egress,
        Some(Direction::Unrecognized(other)) => {
            return Err(HotCidrError::InvalidDirection {
                group: group.to_string(),
                direction: other.clone(),
            })
        }
        None => {
            return Err(HotCidrError::InvalidDirection {
                group: group.to_string(),
                direction: "<missing>".to_string(),
            })
        }
    };
    let protocol = match &rule.protocol {
        Some(Protocol::All) => WILDCARD_PROTOCOL.to_string(),
        Some(Protocol::Named(name)) => name.clone(),
        None => {
            return Err(HotCidrError::InvalidRule {
                group: group.to_string(),
                reason: format!("rule {} has no protocol", rule),
            })
        }
    };
    let location = rule.location.as_ref().ok_or_else(|| HotCidrError::InvalidRule {
        group: group.to_string(),
        reason: format!("rule {} has no location", rule),
    })?;
    let (from_port, to_port) = rule
        .ports
        .map_or((WILDCARD_PORT, WILDCARD_PORT), |p| (p.from, p.to));

    let group_ids = lookup_group_ids(connector, group)?;
    let destinations: Vec<Destination> = match location.target() {
        Target::Cidr(cidr) => vec![Destination::Cidr(cidr)],
        Target::Group(peer) => lookup_group_ids(connector, &peer)?
            .into_iter()
            .map(|group_id| Destination::Group {
                group_id,
                parameter: GroupParameter::PRIMARY,
            })
            .collect(),
    };

    if group_ids.is_empty() || destinations.is_empty() {
        // Unknown names are dropped rather than reported.
        tracing::warn!(
            group = group,
            location = %location,
            group_ids = group_ids.len(),
            destinations = destinations.len(),
            "rule resolves to no connector calls"
        );
    }

    let op = op_name(change, flow);
    for group_id in &group_ids {
        for destination in &destinations {
            let request = RuleRequest {
                group_id: group_id.clone(),
                protocol: protocol.clone(),
                from_port,
                to_port,
                destination: destination.clone(),
            };
            issue_with_fallback(connector, change, flow, &request)
                .map_err(|e| e.into_domain(op))?;
        }
    }
    Ok(())
}
