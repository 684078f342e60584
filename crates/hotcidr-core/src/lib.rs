//! HotCIDR Core - security-group reconciliation kernel
//!
//! This crate provides the data model and the reconciliation pipeline:
//! - Group, instance and rule records, and the [`model::Snapshot`] holding them
//! - Canonical rule identity used for rule-set comparison
//! - The three-phase diff engine producing an ordered action sequence
//! - The closed [`Action`] set and the [`connector::Connector`] capability it runs against
//! - The sequential executor with dry-run and progress reporting
//! - Change summaries and the `reconcile` process surface
//!
//! Everything is synchronous and single-threaded.

pub mod actions;
pub mod connector;
pub mod diff;
pub mod errors;
pub mod executor;
pub mod identity;
pub mod logging_facility;
pub mod model;
pub mod reconcile;
pub mod summary;

pub use hotcidr_core_types::schema;

// Re-export commonly used types
pub use actions::{Action, ActionKind};
pub use connector::{Connector, ConnectorError, MemoryCloud};
pub use diff::{compute_diff, compute_diff_with_options, DiffOptions};
pub use errors::{ExError, ExErrorKind, HotCidrError, Result};
pub use executor::{execute, ExecuteOptions, ExecutionError, NoProgress, ProgressSink};
pub use identity::RuleIdentity;
pub use model::{GroupRecord, InstanceRecord, RuleRecord, Snapshot, SnapshotSource};
pub use reconcile::{reconcile, reconcile_with_context};
pub use summary::ChangeSummary;
