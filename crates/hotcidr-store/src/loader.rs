//! Snapshot loading from a state directory
//!
//! Layout:
//!
//! ```text
//! <dir>/groups/<name>.yaml   one security group per file, keyed by file stem
//! <dir>/boxes.yaml           instance id -> { groups, ip, domain }
//! ```
//!
//! A missing `groups/` directory or `boxes.yaml` reads as an empty table.

use hotcidr_core::errors::ExError;
use hotcidr_core::model::{GroupRecord, InstanceRecord, Snapshot, SnapshotSource};
use hotcidr_core::{log_op_end, log_op_error, log_op_start};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{io_error, snapshot_invalid, yaml_error, Result};

pub const GROUPS_DIR: &str = "groups";
pub const BOXES_FILE: &str = "boxes.yaml";

/// True for `.yaml` / `.yml` files
fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Parse a YAML file; an empty file yields `T::default()`
fn read_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| io_error("read_state_file", path, e))?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&content).map_err(|e| yaml_error("parse_state_file", path, e))
}

/// Sorted list of group files under `groups_dir`; empty when the directory is absent
fn group_files(groups_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(groups_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error("list_groups", groups_dir, e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| io_error("list_groups", groups_dir, e))?
            .path();
        if path.is_file() && is_yaml(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load a snapshot from a state directory.
///
/// # Errors
///
/// - `InvalidSnapshot` if `dir` is not a directory or a file name is not UTF-8
/// - `Io` if a file cannot be read
/// - `Serialization` if a file is not valid YAML for its record shape
/// - `DuplicateRecord` if two files name the same group (`web.yaml` and `web.yml`)
pub fn load_snapshot(dir: &Path) -> Result<Snapshot> {
    log_op_start!("load_snapshot", dir = %dir.display());
    let start = std::time::Instant::now();

    let result = load_snapshot_impl(dir).map_err(|e| {
        log_op_error!(
            "load_snapshot",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "load_snapshot",
        duration_ms = start.elapsed().as_millis() as u64,
        groups = result.groups().len(),
        instances = result.instances().len()
    );
    Ok(result)
}

fn load_snapshot_impl(dir: &Path) -> Result<Snapshot> {
    if !dir.is_dir() {
        return Err(snapshot_invalid(dir, "state directory does not exist"));
    }
    let mut snapshot = Snapshot::new();

    for path in group_files(&dir.join(GROUPS_DIR))? {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| snapshot_invalid(&path, "group file name is not valid UTF-8"))?
            .to_string();
        let group: GroupRecord = read_yaml(&path)?;
        snapshot
            .insert_group(name, group)
            .map_err(|e| ExError::from(e).with_op("load_snapshot"))?;
    }

    let boxes_path = dir.join(BOXES_FILE);
    if boxes_path.is_file() {
        let boxes: BTreeMap<String, InstanceRecord> = read_yaml(&boxes_path)?;
        for (instance_id, instance) in boxes {
            snapshot
                .insert_instance(instance_id, instance)
                .map_err(|e| ExError::from(e).with_op("load_snapshot"))?;
        }
    } else {
        tracing::debug!(path = %boxes_path.display(), "no boxes file, instance table empty");
    }

    Ok(snapshot)
}

/// A state directory used as a [`SnapshotSource`]
///
/// The directory is re-read on every load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDir {
    root: PathBuf,
}

impl RepoDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SnapshotSource for RepoDir {
    fn load_snapshot(&self) -> std::result::Result<Snapshot, ExError> {
        load_snapshot(&self.root)
    }
}
