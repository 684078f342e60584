//! State records shared by the desired and actual snapshots
//!
//! Both snapshots have the same shape: a table of security groups keyed by
//! name and a table of instances keyed by provider instance id. The records
//! are plain data; nothing here talks to a provider.

pub mod records;
pub mod rule;
pub mod snapshot;

pub use records::{GroupRecord, InstanceRecord};
pub use rule::{Direction, Location, PortRange, Protocol, RuleRecord, Target};
pub use snapshot::{Snapshot, SnapshotSource};
