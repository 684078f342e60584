#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Executor and action-application scenarios against in-memory connectors.

use std::collections::BTreeSet;

use hotcidr_core::connector::{
    ConnectorCall, ConnectorOp, Destination, GroupParameter, MemoryCloud, RuleRequest,
};
use hotcidr_core::model::{GroupRecord, RuleRecord, Snapshot};
use hotcidr_core::{
    compute_diff, execute, Action, ChangeSummary, Connector, ConnectorError, ExecuteOptions,
    HotCidrError, RuleIdentity,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run(
    actions: &[Action],
    cloud: &mut dyn Connector,
    options: ExecuteOptions,
) -> (Vec<String>, Result<ChangeSummary, hotcidr_core::ExecutionError>) {
    let mut lines = Vec::new();
    let mut sink = |index: usize, total: usize, description: &str| {
        lines.push(format!("Action {}/{}: {}", index, total, description));
    };
    let result = execute(actions, cloud, options, &mut sink);
    (lines, result)
}

fn add(group: &str, rule: RuleRecord) -> Action {
    Action::AddRule {
        group: group.to_string(),
        rule: RuleIdentity::of(&rule),
    }
}

fn cloud_with_groups(names: &[&str]) -> MemoryCloud {
    let mut cloud = MemoryCloud::new();
    for name in names {
        cloud.create_security_group(name, "test").unwrap();
    }
    cloud
}

fn rule_requests(cloud: &MemoryCloud) -> Vec<(ConnectorOp, RuleRequest)> {
    cloud
        .calls()
        .iter()
        .filter_map(|call| match call {
            ConnectorCall::Rule { op, request } => Some((*op, request.clone())),
            _ => None,
        })
        .collect()
}

/// Connector whose name lookup returns several ids for one name
#[derive(Default)]
struct FanOutConnector {
    requests: Vec<RuleRequest>,
}

impl Connector for FanOutConnector {
    fn create_security_group(&mut self, _: &str, _: &str) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn set_instance_attribute(
        &mut self,
        _: &str,
        _: &str,
        _: &BTreeSet<String>,
    ) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn authorize_ingress(&mut self, request: &RuleRequest) -> Result<(), ConnectorError> {
        self.requests.push(request.clone());
        Ok(())
    }

    fn revoke_ingress(&mut self, request: &RuleRequest) -> Result<(), ConnectorError> {
        self.requests.push(request.clone());
        Ok(())
    }

    fn authorize_egress(&mut self, request: &RuleRequest) -> Result<(), ConnectorError> {
        self.requests.push(request.clone());
        Ok(())
    }

    fn revoke_egress(&mut self, request: &RuleRequest) -> Result<(), ConnectorError> {
        self.requests.push(request.clone());
        Ok(())
    }

    fn security_group_ids(&self, name: &str) -> Result<Vec<String>, ConnectorError> {
        Ok(match name {
            "web" => vec!["sg-web".to_string()],
            "db" => vec!["sg-db-a".to_string(), "sg-db-b".to_string()],
            _ => Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[test]
fn test_dry_run_matches_real_run_without_calls() {
    let mut desired = Snapshot::new();
    desired
        .insert_group(
            "web",
            GroupRecord::new()
                .with_rule(RuleRecord::inbound().with_protocol("tcp").with_location("0.0.0.0/0").with_ports(80, 80))
                .with_rule(RuleRecord::outbound().with_protocol("all").with_location("all")),
        )
        .unwrap();
    let actions = compute_diff(&desired, &Snapshot::new());

    let mut dry_cloud = MemoryCloud::new();
    let (dry_lines, dry_summary) = run(&actions, &mut dry_cloud, ExecuteOptions::dry_run());

    let mut live_cloud = MemoryCloud::new();
    let (live_lines, live_summary) = run(&actions, &mut live_cloud, ExecuteOptions::default());

    assert!(dry_cloud.calls().is_empty());
    assert_eq!(live_cloud.calls().len(), 3);
    assert_eq!(dry_lines, live_lines);
    assert_eq!(dry_summary.unwrap(), live_summary.unwrap());
    assert_eq!(
        dry_lines[0],
        "Action 1/3: Create new security group web (Automatically created by HotCIDR)"
    );
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_direction_aborts_before_next_action() {
    let actions = vec![
        Action::CreateGroup {
            name: "web".to_string(),
            description: "Web".to_string(),
        },
        add("web", RuleRecord::inbound().with_protocol("tcp").with_location("10.0.0.0/8").with_ports(22, 22)),
        add("web", RuleRecord::new("sideways").with_protocol("tcp").with_location("10.0.0.0/8")),
        add("web", RuleRecord::outbound().with_protocol("udp").with_location("10.0.0.0/8")),
    ];
    let mut cloud = MemoryCloud::new();

    let (lines, result) = run(&actions, &mut cloud, ExecuteOptions::default());
    let err = result.unwrap_err();

    assert_eq!(err.index, 3);
    assert_eq!(
        err.source,
        HotCidrError::InvalidDirection {
            group: "web".to_string(),
            direction: "sideways".to_string(),
        }
    );
    assert_eq!(lines.len(), 3);
    assert_eq!(cloud.calls().len(), 2);

    // The first two actions stay applied.
    let state = cloud.snapshot().unwrap();
    assert_eq!(state.group("web").unwrap().rules.len(), 1);

    // The summary still reflects the whole plan.
    assert_eq!(err.summary, ChangeSummary::from_actions(&actions));
    assert_eq!(err.summary.rules_added, 3);
}

#[test]
fn test_missing_protocol_is_rejected_without_calls() {
    let mut cloud = cloud_with_groups(&["web"]);
    let before = cloud.calls().len();
    let actions = vec![add("web", RuleRecord::inbound().with_location("10.0.0.0/8"))];

    let (_, result) = run(&actions, &mut cloud, ExecuteOptions::default());

    assert!(matches!(
        result.unwrap_err().source,
        HotCidrError::InvalidRule { ref group, .. } if group == "web"
    ));
    assert_eq!(cloud.calls().len(), before);
}

#[test]
fn test_provider_failure_propagates_without_retry() {
    let mut cloud = cloud_with_groups(&["web", "db"]);
    cloud.fail_operation(ConnectorOp::AuthorizeIngress, "Throttling");
    let actions = vec![add("web", RuleRecord::inbound().with_protocol("tcp").with_location("db"))];

    let (_, result) = run(&actions, &mut cloud, ExecuteOptions::default());

    assert!(matches!(
        result.unwrap_err().source,
        HotCidrError::Connector { ref op, ref code, .. } if op == "authorize_ingress" && code == "Throttling"
    ));
    assert_eq!(rule_requests(&cloud).len(), 1);
}

// ---------------------------------------------------------------------------
// Execution-time resolution
// ---------------------------------------------------------------------------

#[test]
fn test_unsupported_parameter_retries_with_alternate() {
    let mut cloud = cloud_with_groups(&["web", "db"]);
    cloud.reject_parameter(GroupParameter::PRIMARY);
    let actions = vec![add("web", RuleRecord::outbound().with_protocol("tcp").with_location("db").with_ports(5432, 5432))];

    let (_, result) = run(&actions, &mut cloud, ExecuteOptions::default());
    result.unwrap();

    let requests = rule_requests(&cloud);
    assert_eq!(requests.len(), 2);
    assert!(matches!(
        requests[0].1.destination,
        Destination::Group { parameter, .. } if parameter == GroupParameter::PRIMARY
    ));
    assert!(matches!(
        requests[1].1.destination,
        Destination::Group { parameter, .. } if parameter == GroupParameter::PRIMARY.alternate()
    ));
    assert_eq!(requests[1].0, ConnectorOp::AuthorizeEgress);
}

#[test]
fn test_both_parameters_rejected_fails() {
    let mut cloud = cloud_with_groups(&["web", "db"]);
    cloud.reject_parameter(GroupParameter::SourceGroupId);
    cloud.reject_parameter(GroupParameter::SourceSecurityGroupGroupId);
    let actions = vec![add("web", RuleRecord::inbound().with_protocol("tcp").with_location("db"))];

    let (_, result) = run(&actions, &mut cloud, ExecuteOptions::default());

    assert!(matches!(
        result.unwrap_err().source,
        HotCidrError::UnsupportedParameter { .. }
    ));
    assert_eq!(rule_requests(&cloud).len(), 2);
}

#[test]
fn test_cidr_destination_is_not_retried() {
    let mut cloud = cloud_with_groups(&["web"]);
    cloud.reject_parameter(GroupParameter::PRIMARY);
    let actions = vec![add("web", RuleRecord::inbound().with_protocol("tcp").with_location("10.1.0.0/16"))];

    let (_, result) = run(&actions, &mut cloud, ExecuteOptions::default());
    result.unwrap();

    assert_eq!(rule_requests(&cloud).len(), 1);
}

#[test]
fn test_wildcards_resolved_at_execution() {
    let mut cloud = cloud_with_groups(&["web"]);
    let actions = vec![add("web", RuleRecord::inbound().with_protocol("all").with_location("all"))];

    let (_, result) = run(&actions, &mut cloud, ExecuteOptions::default());
    result.unwrap();

    let requests = rule_requests(&cloud);
    assert_eq!(requests.len(), 1);
    let request = &requests[0].1;
    assert_eq!(request.protocol, "-1");
    assert_eq!((request.from_port, request.to_port), (-1, -1));
    assert_eq!(request.destination, Destination::Cidr("0.0.0.0/0".to_string()));
}

#[test]
fn test_group_reference_fans_out_per_resolved_id() {
    let mut connector = FanOutConnector::default();
    let actions = vec![
        add("web", RuleRecord::inbound().with_protocol("tcp").with_location("db").with_ports(5432, 5432)),
        Action::RemoveRule {
            group: "db".to_string(),
            rule: RuleIdentity::of(&RuleRecord::outbound().with_protocol("udp").with_location("192.168.0.0/24")),
        },
    ];

    let (_, result) = run(&actions, &mut connector, ExecuteOptions::default());
    result.unwrap();

    let peers: Vec<(&str, &Destination)> = connector
        .requests
        .iter()
        .map(|r| (r.group_id.as_str(), &r.destination))
        .collect();
    assert_eq!(peers.len(), 4);
    assert_eq!(peers[0].0, "sg-web");
    assert!(matches!(peers[0].1, Destination::Group { group_id, .. } if group_id == "sg-db-a"));
    assert!(matches!(peers[1].1, Destination::Group { group_id, .. } if group_id == "sg-db-b"));
    // The rule's own group name fans out too.
    assert_eq!(peers[2].0, "sg-db-a");
    assert_eq!(peers[3].0, "sg-db-b");
}

#[test]
fn test_unknown_group_reference_is_silently_skipped() {
    let mut cloud = cloud_with_groups(&["web"]);
    let before = cloud.calls().len();
    let actions = vec![add("web", RuleRecord::inbound().with_protocol("tcp").with_location("ghost"))];

    let (lines, result) = run(&actions, &mut cloud, ExecuteOptions::default());

    assert_eq!(result.unwrap().rules_added, 1);
    assert_eq!(lines.len(), 1);
    assert_eq!(cloud.calls().len(), before);
}
