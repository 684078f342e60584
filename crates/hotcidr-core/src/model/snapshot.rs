use std::collections::BTreeMap;

use crate::errors::{ExError, HotCidrError, Result};
use crate::model::records::{GroupRecord, InstanceRecord};

/// One side of a reconciliation: every group and instance known to a source
///
/// Tables are ordered maps so that anything iterating a snapshot does so in
/// key order. A snapshot holds at most one record per group name and per
/// instance id; the insert methods refuse duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    groups: BTreeMap<String, GroupRecord>,
    instances: BTreeMap<String, InstanceRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group record.
    ///
    /// # Errors
    ///
    /// `DuplicateRecord` if a group with this name is already present.
    pub fn insert_group(&mut self, name: impl Into<String>, group: GroupRecord) -> Result<()> {
        let name = name.into();
        if self.groups.contains_key(&name) {
            return Err(HotCidrError::DuplicateRecord {
                kind: "group".to_string(),
                key: name,
            });
        }
        self.groups.insert(name, group);
        Ok(())
    }

    /// Add an instance record.
    ///
    /// # Errors
    ///
    /// `DuplicateRecord` if an instance with this id is already present.
    pub fn insert_instance(
        &mut self,
        instance_id: impl Into<String>,
        instance: InstanceRecord,
    ) -> Result<()> {
        let instance_id = instance_id.into();
        if self.instances.contains_key(&instance_id) {
            return Err(HotCidrError::DuplicateRecord {
                kind: "instance".to_string(),
                key: instance_id,
            });
        }
        self.instances.insert(instance_id, instance);
        Ok(())
    }

    pub fn group(&self, name: &str) -> Option<&GroupRecord> {
        self.groups.get(name)
    }

    pub fn instance(&self, instance_id: &str) -> Option<&InstanceRecord> {
        self.instances.get(instance_id)
    }

    /// Provider id of a group, if the group is present and carries one
    pub fn group_id(&self, name: &str) -> Option<&str> {
        self.groups.get(name).and_then(|g| g.id.as_deref())
    }

    pub fn groups(&self) -> &BTreeMap<String, GroupRecord> {
        &self.groups
    }

    pub fn instances(&self) -> &BTreeMap<String, InstanceRecord> {
        &self.instances
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.instances.is_empty()
    }
}

/// Anything that can produce a snapshot for one reconciliation run
///
/// Implemented by [`Snapshot`] itself for in-memory use; file-backed and
/// provider-backed sources live outside the core.
pub trait SnapshotSource {
    /// Produce a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Source-specific; loading failures are reported as structured errors.
    fn load_snapshot(&self) -> std::result::Result<Snapshot, ExError>;
}

impl SnapshotSource for Snapshot {
    fn load_snapshot(&self) -> std::result::Result<Snapshot, ExError> {
        Ok(self.clone())
    }
}
