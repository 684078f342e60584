//! HotCIDR Store - state snapshots as a directory of YAML files
//!
//! Provides:
//! - Loading a [`hotcidr_core::model::Snapshot`] from a state directory
//! - [`RepoDir`], a directory-backed snapshot source
//! - Saving a snapshot back with atomic per-file writes

pub mod atomic;
pub mod errors;
pub mod loader;
pub mod writer;

// Re-export key types
pub use errors::Result;
pub use loader::{load_snapshot, RepoDir, BOXES_FILE, GROUPS_DIR};
pub use writer::save_snapshot;
