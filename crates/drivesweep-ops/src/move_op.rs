//! Per-item move.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::conflict::{PlaceError, place_unique};
use crate::copy::{CopyOptions, copy_into};
use crate::operation::{ItemErrorKind, OperationError};

/// Move `source` into `dest_dir` under a name that does not exist yet.
///
/// On the same file system the file is linked under its new name and then
/// unlinked from the old one, so no data is copied and nothing is replaced.
/// Otherwise the file is copied and the source removed once the copy is
/// complete. If the source cannot be removed the new copy is discarded and
/// the item fails.
pub(crate) fn move_into(
    source: &Path,
    dest_dir: &Path,
    options: CopyOptions,
) -> Result<(PathBuf, u64), OperationError> {
    let metadata = fs::metadata(source).map_err(|e| OperationError::from_io(source, &e))?;
    if !metadata.is_file() {
        return Err(OperationError::new(
            source,
            ItemErrorKind::Io,
            "Not a regular file",
        ));
    }
    let file_name = source
        .file_name()
        .ok_or_else(|| OperationError::new(source, ItemErrorKind::Io, "Path has no file name"))?;

    let linked = place_unique(dest_dir, file_name, options.max_rename_attempts, |candidate| {
        fs::hard_link(source, candidate)
    });

    let target = match linked {
        Ok(target) => target,
        Err(PlaceError::Exhausted) => {
            return Err(OperationError::collision_limit(
                source,
                options.max_rename_attempts,
            ));
        }
        Err(PlaceError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            return Err(OperationError::from_io(source, &err));
        }
        Err(PlaceError::Io(err)) => {
            debug!(path = %source.display(), error = %err, "link failed, moving by copy");
            return move_by_copy(source, dest_dir, options);
        }
    };

    if let Err(err) = fs::remove_file(source) {
        let _ = fs::remove_file(&target);
        return Err(OperationError::from_io(source, &err));
    }

    debug!(from = %source.display(), to = %target.display(), "moved");
    Ok((target, metadata.len()))
}

fn move_by_copy(
    source: &Path,
    dest_dir: &Path,
    options: CopyOptions,
) -> Result<(PathBuf, u64), OperationError> {
    let (target, bytes) = copy_into(source, dest_dir, options)?;

    if let Err(err) = fs::remove_file(source) {
        let _ = fs::remove_file(&target);
        return Err(OperationError::from_io(source, &err));
    }

    debug!(from = %source.display(), to = %target.display(), bytes, "moved by copy");
    Ok((target, bytes))
}
