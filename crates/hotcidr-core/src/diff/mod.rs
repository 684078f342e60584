//! Desired-vs-actual diff engine.
//!
//! Compares two snapshots and produces the ordered action sequence that
//! converges the actual side onto the desired side.
//!
//! ## Entry point
//!
//! ```
//! use hotcidr_core::diff::compute_diff;
//! use hotcidr_core::model::{GroupRecord, RuleRecord, Snapshot};
//!
//! let mut desired = Snapshot::new();
//! desired
//!     .insert_group("web", GroupRecord::new().with_rule(RuleRecord::inbound().with_protocol("tcp")))
//!     .unwrap();
//! let actions = compute_diff(&desired, &Snapshot::new());
//! assert_eq!(actions.len(), 2);
//! ```
//!
//! ## Guarantees
//!
//! - **Phase order**: group creations, then instance membership updates, then
//!   per-group rule changes. A group is always created before any rule
//!   action names it.
//! - **Determinism**: groups, instances and rules are visited in sorted
//!   order, so identical inputs yield identical sequences.
//! - **Infallible**: unresolvable names are skipped and missing groups read
//!   as empty rule sets; nothing here returns an error.
//! - **No deletions**: groups present only in the actual snapshot are left alone.

pub mod engine;

pub use engine::{compute_diff, compute_diff_with_options, DiffOptions, DEFAULT_GROUP_DESCRIPTION};
