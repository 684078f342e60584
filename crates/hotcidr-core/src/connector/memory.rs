//! In-memory connector
//!
//! `MemoryCloud` models the provider state HotCIDR touches: named groups with
//! ingress and egress rule sets, and instances with attached group ids. It
//! records every call it receives, and can be told to reject a group
//! parameter variant or fail an operation outright.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    Connector, ConnectorError, Destination, GroupParameter, RuleRequest, GROUP_SET_ATTRIBUTE,
    WILDCARD_PORT, WILDCARD_PROTOCOL,
};
use crate::actions::Action;
use crate::errors::{HotCidrError, Result};
use crate::identity::RuleIdentity;
use crate::model::{
    Direction, GroupRecord, InstanceRecord, Location, PortRange, Protocol, RuleRecord, Snapshot,
};

/// Mutating connector operations, as recorded and as targeted by fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectorOp {
    CreateSecurityGroup,
    SetInstanceAttribute,
    AuthorizeIngress,
    RevokeIngress,
    AuthorizeEgress,
    RevokeEgress,
}

/// One call received by a [`MemoryCloud`], whether or not it succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorCall {
    CreateSecurityGroup {
        name: String,
        description: String,
    },
    SetInstanceAttribute {
        instance_id: String,
        attribute: String,
        value: BTreeSet<String>,
    },
    Rule {
        op: ConnectorOp,
        request: RuleRequest,
    },
}

impl ConnectorCall {
    pub fn op(&self) -> ConnectorOp {
        match self {
            ConnectorCall::CreateSecurityGroup { .. } => ConnectorOp::CreateSecurityGroup,
            ConnectorCall::SetInstanceAttribute { .. } => ConnectorOp::SetInstanceAttribute,
            ConnectorCall::Rule { op, .. } => *op,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Peer {
    Cidr(String),
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StoredRule {
    protocol: String,
    from_port: i32,
    to_port: i32,
    peer: Peer,
}

impl From<&RuleRequest> for StoredRule {
    fn from(request: &RuleRequest) -> Self {
        let peer = match &request.destination {
            Destination::Cidr(cidr) => Peer::Cidr(cidr.clone()),
            Destination::Group { group_id, .. } => Peer::Group(group_id.clone()),
        };
        StoredRule {
            protocol: request.protocol.clone(),
            from_port: request.from_port,
            to_port: request.to_port,
            peer,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CloudGroup {
    name: String,
    description: String,
    ingress: BTreeSet<StoredRule>,
    egress: BTreeSet<StoredRule>,
}

impl CloudGroup {
    fn named(name: &str, record: &GroupRecord) -> Self {
        CloudGroup {
            name: name.to_string(),
            description: record.description.clone().unwrap_or_default(),
            ..CloudGroup::default()
        }
    }
}

/// In-memory provider
#[derive(Debug, Clone, Default)]
pub struct MemoryCloud {
    groups: BTreeMap<String, CloudGroup>,
    instances: BTreeMap<String, BTreeSet<String>>,
    next_id: u32,
    calls: Vec<ConnectorCall>,
    rejected_parameters: BTreeSet<GroupParameter>,
    failing_ops: BTreeMap<ConnectorOp, String>,
}

impl MemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cloud holding the state described by an actual snapshot.
    ///
    /// Group ids from the snapshot are kept; groups without one get a fresh
    /// id that no declared id uses. Rules are loaded by applying add-rule actions, so they go through
    /// the same resolution as a live run. The call log starts empty.
    ///
    /// # Errors
    ///
    /// - `DuplicateRecord` when two groups declare the same id
    /// - any error applying a rule, e.g. `InvalidDirection` for a rule whose
    ///   direction is not inbound or outbound
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let mut cloud = MemoryCloud::new();
        for (name, group) in snapshot.groups() {
            let Some(id) = &group.id else { continue };
            if cloud.groups.contains_key(id) {
                return Err(HotCidrError::DuplicateRecord {
                    kind: "group id".to_string(),
                    key: id.clone(),
                });
            }
            cloud.groups.insert(id.clone(), CloudGroup::named(name, group));
        }
        for (name, group) in snapshot.groups().iter().filter(|(_, g)| g.id.is_none()) {
            let id = cloud.allocate_id();
            cloud.groups.insert(id, CloudGroup::named(name, group));
        }
        for (name, group) in snapshot.groups() {
            for rule in RuleIdentity::set_of(&group.rules) {
                Action::AddRule {
                    group: name.clone(),
                    rule,
                }
                .apply(&mut cloud)?;
            }
        }
        for (instance_id, instance) in snapshot.instances() {
            let mut group_ids = BTreeSet::new();
            for name in instance.groups.iter().flatten() {
                group_ids.extend(cloud.ids_named(name));
            }
            cloud.instances.insert(instance_id.clone(), group_ids);
        }
        cloud.calls.clear();
        Ok(cloud)
    }

    /// Describe the current state as an actual snapshot
    ///
    /// Wildcards map back to their symbolic forms (`-1` protocol to `all`,
    /// `-1..-1` ports to no ports). CIDR peers stay literal, so a rule
    /// authorized from the `all` location reads back as `0.0.0.0/0`.
    ///
    /// # Errors
    ///
    /// `DuplicateRecord` if two groups share a name, which only happens when
    /// the cloud was built from inconsistent input.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        for (id, group) in &self.groups {
            let mut record = GroupRecord::new().with_id(id.clone());
            if !group.description.is_empty() {
                record = record.with_description(group.description.clone());
            }
            for rule in &group.ingress {
                record = record.with_rule(self.rule_record(Direction::Inbound, rule));
            }
            for rule in &group.egress {
                record = record.with_rule(self.rule_record(Direction::Outbound, rule));
            }
            snapshot.insert_group(group.name.clone(), record)?;
        }
        for (instance_id, group_ids) in &self.instances {
            let names = group_ids.iter().map(|id| self.name_of(id));
            snapshot.insert_instance(instance_id.clone(), InstanceRecord::with_groups(names))?;
        }
        Ok(snapshot)
    }

    /// Register an instance with no groups attached
    pub fn add_instance(&mut self, instance_id: impl Into<String>) {
        self.instances.entry(instance_id.into()).or_default();
    }

    /// Answer every call passing this group parameter with `UnsupportedParameter`
    pub fn reject_parameter(&mut self, parameter: GroupParameter) {
        self.rejected_parameters.insert(parameter);
    }

    /// Fail every call of `op` with a provider error carrying `code`
    pub fn fail_operation(&mut self, op: ConnectorOp, code: impl Into<String>) {
        self.failing_ops.insert(op, code.into());
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> &[ConnectorCall] {
        &self.calls
    }

    /// Group ids attached to an instance
    pub fn instance_groups(&self, instance_id: &str) -> Option<&BTreeSet<String>> {
        self.instances.get(instance_id)
    }

    fn allocate_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("sg-{:08x}", self.next_id);
            if !self.groups.contains_key(&id) {
                return id;
            }
        }
    }

    fn ids_named(&self, name: &str) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, group)| group.name == name)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn name_of(&self, id: &str) -> String {
        self.groups
            .get(id)
            .map_or_else(|| id.to_string(), |group| group.name.clone())
    }

    fn rule_record(&self, direction: Direction, rule: &StoredRule) -> RuleRecord {
        let protocol = if rule.protocol == WILDCARD_PROTOCOL {
            Protocol::All
        } else {
            Protocol::Named(rule.protocol.clone())
        };
        let location = match &rule.peer {
            Peer::Cidr(cidr) => Location::Literal(cidr.clone()),
            Peer::Group(id) => Location::from(self.name_of(id)),
        };
        let mut record = RuleRecord::new(direction).with_protocol(protocol);
        record.location = Some(location);
        if (rule.from_port, rule.to_port) != (WILDCARD_PORT, WILDCARD_PORT) {
            record.ports = Some(PortRange::new(rule.from_port, rule.to_port));
        }
        record
    }

    fn check_injected(&self, op: ConnectorOp) -> std::result::Result<(), ConnectorError> {
        match self.failing_ops.get(&op) {
            Some(code) => Err(ConnectorError::provider(
                code.clone(),
                format!("injected failure for {:?}", op),
            )),
            None => Ok(()),
        }
    }

    fn modify_rule(
        &mut self,
        op: ConnectorOp,
        request: &RuleRequest,
    ) -> std::result::Result<(), ConnectorError> {
        self.calls.push(ConnectorCall::Rule {
            op,
            request: request.clone(),
        });
        self.check_injected(op)?;

        if let Destination::Group {
            group_id,
            parameter,
        } = &request.destination
        {
            if self.rejected_parameters.contains(parameter) {
                return Err(ConnectorError::UnsupportedParameter {
                    parameter: parameter.name().to_string(),
                });
            }
            if !self.groups.contains_key(group_id) {
                return Err(group_not_found(group_id));
            }
        }

        let group = self
            .groups
            .get_mut(&request.group_id)
            .ok_or_else(|| group_not_found(&request.group_id))?;
        let rules = match op {
            ConnectorOp::AuthorizeIngress | ConnectorOp::RevokeIngress => &mut group.ingress,
            _ => &mut group.egress,
        };
        let rule = StoredRule::from(request);
        match op {
            ConnectorOp::AuthorizeIngress | ConnectorOp::AuthorizeEgress => {
                if !rules.insert(rule) {
                    return Err(ConnectorError::provider(
                        "InvalidPermission.Duplicate",
                        format!("rule already exists on {}", request.group_id),
                    ));
                }
            }
            _ => {
                if !rules.remove(&rule) {
                    return Err(ConnectorError::provider(
                        "InvalidPermission.NotFound",
                        format!("rule does not exist on {}", request.group_id),
                    ));
                }
            }
        }
        tracing::trace!(op = ?op, group_id = %request.group_id, "memory cloud rule change");
        Ok(())
    }
}

fn group_not_found(id: &str) -> ConnectorError {
    ConnectorError::provider(
        "InvalidGroup.NotFound",
        format!("security group {} does not exist", id),
    )
}

impl Connector for MemoryCloud {
    fn create_security_group(
        &mut self,
        name: &str,
        description: &str,
    ) -> std::result::Result<(), ConnectorError> {
        self.calls.push(ConnectorCall::CreateSecurityGroup {
            name: name.to_string(),
            description: description.to_string(),
        });
        self.check_injected(ConnectorOp::CreateSecurityGroup)?;
        if !self.ids_named(name).is_empty() {
            return Err(ConnectorError::provider(
                "InvalidGroup.Duplicate",
                format!("security group {} already exists", name),
            ));
        }
        let id = self.allocate_id();
        self.groups.insert(
            id,
            CloudGroup {
                name: name.to_string(),
                description: description.to_string(),
                ..CloudGroup::default()
            },
        );
        Ok(())
    }

    fn set_instance_attribute(
        &mut self,
        instance_id: &str,
        attribute: &str,
        value: &BTreeSet<String>,
    ) -> std::result::Result<(), ConnectorError> {
        self.calls.push(ConnectorCall::SetInstanceAttribute {
            instance_id: instance_id.to_string(),
            attribute: attribute.to_string(),
            value: value.clone(),
        });
        self.check_injected(ConnectorOp::SetInstanceAttribute)?;
        if attribute != GROUP_SET_ATTRIBUTE {
            return Err(ConnectorError::provider(
                "InvalidParameterValue",
                format!("unsupported instance attribute {}", attribute),
            ));
        }
        if let Some(missing) = value.iter().find(|id| !self.groups.contains_key(*id)) {
            return Err(group_not_found(missing));
        }
        let groups = self.instances.get_mut(instance_id).ok_or_else(|| {
            ConnectorError::provider(
                "InvalidInstanceID.NotFound",
                format!("instance {} does not exist", instance_id),
            )
        })?;
        *groups = value.clone();
        Ok(())
    }

    fn authorize_ingress(&mut self, request: &RuleRequest) -> std::result::Result<(), ConnectorError> {
        self.modify_rule(ConnectorOp::AuthorizeIngress, request)
    }

    fn revoke_ingress(&mut self, request: &RuleRequest) -> std::result::Result<(), ConnectorError> {
        self.modify_rule(ConnectorOp::RevokeIngress, request)
    }

    fn authorize_egress(&mut self, request: &RuleRequest) -> std::result::Result<(), ConnectorError> {
        self.modify_rule(ConnectorOp::AuthorizeEgress, request)
    }

    fn revoke_egress(&mut self, request: &RuleRequest) -> std::result::Result<(), ConnectorError> {
        self.modify_rule(ConnectorOp::RevokeEgress, request)
    }

    fn security_group_ids(&self, name: &str) -> std::result::Result<Vec<String>, ConnectorError> {
        Ok(self.ids_named(name))
    }
}
