//! Diff computation.
//!
//! The core entry point is [`compute_diff`], which reads two snapshots and
//! returns the ordered [`Action`] sequence. Neither snapshot is modified.

use std::collections::BTreeSet;

use crate::actions::Action;
use crate::identity::RuleIdentity;
use crate::model::Snapshot;
use crate::{log_op_end, log_op_start};

/// Description given to created groups whose desired record has none
pub const DEFAULT_GROUP_DESCRIPTION: &str = "Automatically created by HotCIDR";

/// Tunables for [`compute_diff_with_options`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    pub default_description: String,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            default_description: DEFAULT_GROUP_DESCRIPTION.to_string(),
        }
    }
}

/// Compute the action sequence converging `actual` onto `desired`.
pub fn compute_diff(desired: &Snapshot, actual: &Snapshot) -> Vec<Action> {
    compute_diff_with_options(desired, actual, &DiffOptions::default())
}

/// [`compute_diff`] with explicit options.
pub fn compute_diff_with_options(
    desired: &Snapshot,
    actual: &Snapshot,
    options: &DiffOptions,
) -> Vec<Action> {
    log_op_start!("diff");
    let start = std::time::Instant::now();

    let mut actions = Vec::new();
    create_groups(desired, actual, options, &mut actions);
    update_memberships(desired, actual, &mut actions);
    diff_rules(desired, actual, &mut actions);

    log_op_end!(
        "diff",
        duration_ms = start.elapsed().as_millis() as u64,
        action_count = actions.len()
    );
    actions
}

/// Phase 1: groups present only on the desired side
fn create_groups(
    desired: &Snapshot,
    actual: &Snapshot,
    options: &DiffOptions,
    actions: &mut Vec<Action>,
) {
    for (name, group) in desired.groups() {
        if actual.group(name).is_some() {
            continue;
        }
        let description = group
            .description
            .clone()
            .unwrap_or_else(|| options.default_description.clone());
        tracing::info!(group = %name, "group missing from actual state, planning creation");
        actions.push(Action::CreateGroup {
            name: name.clone(),
            description,
        });
    }
}

/// Phase 2: instances known to both sides whose declared membership differs
fn update_memberships(desired: &Snapshot, actual: &Snapshot, actions: &mut Vec<Action>) {
    for (instance_id, live) in actual.instances() {
        let Some(wanted) = desired
            .instance(instance_id)
            .and_then(|record| record.groups.as_ref())
        else {
            tracing::debug!(instance_id = %instance_id, "no declared membership, skipping");
            continue;
        };
        let current = live.groups.clone().unwrap_or_default();
        if *wanted == current {
            continue;
        }

        let mut group_ids = BTreeSet::new();
        for name in wanted {
            match actual.group_id(name) {
                Some(id) => {
                    group_ids.insert(id.to_string());
                }
                None => tracing::debug!(
                    instance_id = %instance_id,
                    group = %name,
                    "group has no provider id yet, dropped from membership"
                ),
            }
        }
        actions.push(Action::SetInstanceGroups {
            instance_id: instance_id.clone(),
            group_ids,
        });
    }
}

/// Phase 3: per-group rule sets, removals before additions
fn diff_rules(desired: &Snapshot, actual: &Snapshot, actions: &mut Vec<Action>) {
    for (name, group) in desired.groups() {
        let wanted = RuleIdentity::set_of(&group.rules);
        let current = actual
            .group(name)
            .map(|g| RuleIdentity::set_of(&g.rules))
            .unwrap_or_default();

        for rule in current.difference(&wanted) {
            actions.push(Action::RemoveRule {
                group: name.clone(),
                rule: rule.clone(),
            });
        }
        for rule in wanted.difference(&current) {
            actions.push(Action::AddRule {
                group: name.clone(),
                rule: rule.clone(),
            });
        }
    }
}
