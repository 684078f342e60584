//! Error handling for hotcidr-store
//!
//! Wraps hotcidr-core ExError with store-specific helpers

use hotcidr_core::errors::{ExError, ExErrorKind};
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an invalid-snapshot error for a file or directory
pub fn snapshot_invalid(path: &Path, reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidSnapshot)
        .with_op("load_snapshot")
        .with_entity_id(path.display().to_string())
        .with_message(reason.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_entity_id(path.display().to_string())
        .with_message(err.to_string())
}

/// Create a YAML encoding/decoding error
pub fn yaml_error(operation: &str, path: &Path, err: serde_yaml::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_entity_id(path.display().to_string())
        .with_message(format!("YAML error: {}", err))
}
