use serde::Serialize;
use std::fmt;

use crate::actions::{Action, ActionKind};

/// Per-kind counts of a planned action sequence
///
/// Counts describe the plan, not what succeeded: an execution that stops
/// part-way still reports the whole sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChangeSummary {
    pub groups_created: usize,
    pub instances_updated: usize,
    pub rules_added: usize,
    pub rules_removed: usize,
}

impl ChangeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: &[Action]) -> Self {
        let mut summary = Self::new();
        for action in actions {
            summary.count(action);
        }
        summary
    }

    /// Add one action to the tally
    pub fn count(&mut self, action: &Action) {
        match action.kind() {
            ActionKind::CreateGroup => self.groups_created += 1,
            ActionKind::SetInstanceGroups => self.instances_updated += 1,
            ActionKind::AddRule => self.rules_added += 1,
            ActionKind::RemoveRule => self.rules_removed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.groups_created + self.instances_updated + self.rules_added + self.rules_removed
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// One-line rendering; zero counts are omitted
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("No changes");
        }
        let parts: Vec<String> = [
            (self.groups_created, "group(s) created"),
            (self.instances_updated, "instance(s) updated"),
            (self.rules_added, "rule(s) added"),
            (self.rules_removed, "rule(s) removed"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{} {}", n, label))
        .collect();
        f.write_str(&parts.join(", "))
    }
}
