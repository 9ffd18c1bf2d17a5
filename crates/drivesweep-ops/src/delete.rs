//! Per-item delete.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::operation::{DeleteMode, ItemErrorKind, OperationError};

/// Delete one file. Returns its size.
///
/// A file that no longer exists fails with [`ItemErrorKind::NotFound`].
pub(crate) fn delete_file(path: &Path, mode: DeleteMode) -> Result<u64, OperationError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| OperationError::from_io(path, &e))?;
    if metadata.is_dir() {
        return Err(OperationError::new(
            path,
            ItemErrorKind::Io,
            "Not a regular file",
        ));
    }

    match mode {
        DeleteMode::Permanent => {
            fs::remove_file(path).map_err(|e| OperationError::from_io(path, &e))?;
        }
        DeleteMode::Trash => {
            trash::delete(path)
                .map_err(|e| OperationError::new(path, ItemErrorKind::Io, e.to_string()))?;
        }
    }

    debug!(path = %path.display(), ?mode, "deleted");
    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_delete_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        assert_eq!(delete_file(&path, DeleteMode::Permanent).unwrap(), 5);
        assert!(!path.exists());
    }

    #[test]
    fn test_delete_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = delete_file(&temp.path().join("gone.txt"), DeleteMode::Permanent).unwrap_err();
        assert_eq!(err.kind, ItemErrorKind::NotFound);
    }

    #[test]
    fn test_delete_refuses_directories() {
        let temp = TempDir::new().unwrap();
        let err = delete_file(temp.path(), DeleteMode::Permanent).unwrap_err();
        assert_eq!(err.kind, ItemErrorKind::Io);
        assert!(temp.path().exists());
    }
}
