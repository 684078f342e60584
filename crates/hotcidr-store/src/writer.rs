//! Snapshot saving to a state directory
//!
//! Writes the same layout the loader reads. Output is stable: groups and
//! instances are written in key order, and group files that no longer have
//! a matching group are removed.

use hotcidr_core::model::{InstanceRecord, Snapshot};
use hotcidr_core::{log_op_end, log_op_error, log_op_start};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::atomic::atomic_write;
use crate::errors::{io_error, snapshot_invalid, yaml_error, Result};
use crate::loader::{BOXES_FILE, GROUPS_DIR};

/// Group names become file names, so they must be plain path components
fn check_group_name(dir: &Path, name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if bad {
        return Err(snapshot_invalid(
            dir,
            &format!("group name `{}` cannot be used as a file name", name),
        )
        .with_op("save_snapshot"));
    }
    Ok(())
}

/// Save a snapshot into a state directory.
///
/// # Errors
///
/// - `InvalidSnapshot` if a group name is not usable as a file name
/// - `Serialization` if a record cannot be encoded
/// - `Io` if a file cannot be written or a stale group file cannot be removed
pub fn save_snapshot(dir: &Path, snapshot: &Snapshot) -> Result<()> {
    log_op_start!("save_snapshot", dir = %dir.display());
    let start = std::time::Instant::now();

    save_snapshot_impl(dir, snapshot).map_err(|e| {
        log_op_error!(
            "save_snapshot",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "save_snapshot",
        duration_ms = start.elapsed().as_millis() as u64,
        groups = snapshot.groups().len(),
        instances = snapshot.instances().len()
    );
    Ok(())
}

fn save_snapshot_impl(dir: &Path, snapshot: &Snapshot) -> Result<()> {
    let groups_dir = dir.join(GROUPS_DIR);
    for name in snapshot.groups().keys() {
        check_group_name(dir, name)?;
    }

    for (name, group) in snapshot.groups() {
        let path = groups_dir.join(format!("{}.yaml", name));
        let yaml = serde_yaml::to_string(group).map_err(|e| yaml_error("encode_group", &path, e))?;
        atomic_write(&path, yaml.as_bytes())?;
    }
    remove_stale_groups(&groups_dir, snapshot)?;

    let boxes_path = dir.join(BOXES_FILE);
    let boxes: &BTreeMap<String, InstanceRecord> = snapshot.instances();
    let yaml = serde_yaml::to_string(boxes).map_err(|e| yaml_error("encode_boxes", &boxes_path, e))?;
    atomic_write(&boxes_path, yaml.as_bytes())
}

fn remove_stale_groups(groups_dir: &Path, snapshot: &Snapshot) -> Result<()> {
    let entries = match fs::read_dir(groups_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_error("list_groups", groups_dir, e)),
    };
    for entry in entries {
        let path = entry
            .map_err(|e| io_error("list_groups", groups_dir, e))?
            .path();
        let is_group_file = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let stem = path.file_stem().and_then(|s| s.to_str());
        let keep = match stem {
            Some(name) => {
                snapshot.group(name).is_some()
                    && path.extension().and_then(|e| e.to_str()) == Some("yaml")
            }
            None => true,
        };
        if is_group_file && !keep {
            tracing::debug!(path = %path.display(), "removing stale group file");
            fs::remove_file(&path).map_err(|e| io_error("remove_stale_group", &path, e))?;
        }
    }
    Ok(())
}
