use std::path::Path;

use crate::TransferError;
use crate::planner::ChunkBounds;

/// Rejects empty or whitespace-only values. `what` names the field.
pub fn require_non_blank(value: &str, what: &str) -> Result<(), TransferError> {
    if value.trim().is_empty() {
        return Err(TransferError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Rejects chunk sizes outside `bounds`.
pub fn validate_chunk_size(chunk_size: u64, bounds: ChunkBounds) -> Result<(), TransferError> {
    if !bounds.contains(chunk_size) {
        return Err(TransferError::Validation(format!(
            "chunk size {chunk_size} outside [{}, {}]",
            bounds.min, bounds.max
        )));
    }
    Ok(())
}

/// Checks that `path` is an existing, non-empty regular file and returns its size.
pub fn validate_source_file(path: &Path) -> Result<u64, TransferError> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TransferError::Validation(format!(
                "file does not exist: {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if meta.is_dir() {
        return Err(TransferError::Validation(format!(
            "path is a directory: {}",
            path.display()
        )));
    }
    if meta.len() == 0 {
        return Err(TransferError::EmptyFile);
    }
    Ok(meta.len())
}
