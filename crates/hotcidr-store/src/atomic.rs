//! Atomic write primitives
//!
//! Uses temp→rename so a reader never sees a half-written state file

use crate::errors::{io_error, Result};
use std::fs;
use std::path::Path;

/// Atomically write bytes to a file, creating parent directories
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_state_dir", parent, e))?;
    }

    let temp_path = target_path.with_extension("yaml.tmp");
    fs::write(&temp_path, content).map_err(|e| io_error("write_state_temp", &temp_path, e))?;
    fs::rename(&temp_path, target_path)
        .map_err(|e| io_error("rename_state_temp", target_path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("groups").join("web.yaml");

        atomic_write(&target, b"description: Web\n").unwrap();

        let content = fs::read(&target).unwrap();
        assert_eq!(content, b"description: Web\n");
    }

    #[test]
    fn test_no_tmp_files_after_write() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("boxes.yaml");

        atomic_write(&target, b"{}\n").unwrap();
        atomic_write(&target, b"i-1: {}\n").unwrap();

        let tmp_count = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|s| s.ends_with(".tmp"))
                    .unwrap_or(false)
            })
            .count();

        assert_eq!(tmp_count, 0);
        assert_eq!(fs::read(&target).unwrap(), b"i-1: {}\n");
    }
}
