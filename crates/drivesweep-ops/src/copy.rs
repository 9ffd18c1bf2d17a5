//! Per-item copy.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::conflict::{PlaceError, place_unique};
use crate::operation::{ItemErrorKind, OperationError};

/// Options for copying one file.
#[derive(Debug, Clone, Copy)]
pub struct CopyOptions {
    /// Numbered names tried on collision.
    pub max_rename_attempts: usize,
    /// Carry the source modification time and permissions over.
    pub preserve_metadata: bool,
}

/// Copy `source` into `dest_dir` under a name that does not exist yet.
///
/// Returns the path written and the number of bytes copied. An existing
/// file is never replaced.
pub(crate) fn copy_into(
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

    let mut reader = File::open(source).map_err(|e| OperationError::from_io(source, &e))?;
    let mut bytes = 0;

    let target = place_unique(dest_dir, file_name, options.max_rename_attempts, |candidate| {
        bytes = copy_new(&mut reader, candidate)?;
        Ok(())
    })
    .map_err(|err| match err {
        PlaceError::Exhausted => {
            OperationError::collision_limit(source, options.max_rename_attempts)
        }
        PlaceError::Io(e) => OperationError::from_io(source, &e),
    })?;

    if options.preserve_metadata {
        preserve_metadata(&metadata, &target);
    }

    debug!(from = %source.display(), to = %target.display(), bytes, "copied");
    Ok((target, bytes))
}

/// Create `target` exclusively and stream `reader` into it.
///
/// A partially written target is removed again.
pub(crate) fn copy_new(reader: &mut File, target: &Path) -> io::Result<u64> {
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)?;

    let copied = io::copy(reader, &mut writer).and_then(|n| writer.sync_all().map(|()| n));
    match copied {
        Ok(n) => Ok(n),
        Err(err) => {
            drop(writer);
            let _ = fs::remove_file(target);
            Err(err)
        }
    }
}

/// Best-effort copy of modification time and permissions.
pub(crate) fn preserve_metadata(source: &fs::Metadata, target: &Path) {
    if let Ok(modified) = source.modified() {
        let applied = File::options()
            .write(true)
            .open(target)
            .and_then(|file| file.set_modified(modified));
        if let Err(err) = applied {
            debug!(path = %target.display(), error = %err, "could not preserve modification time");
        }
    }
    if let Err(err) = fs::set_permissions(target, source.permissions()) {
        debug!(path = %target.display(), error = %err, "could not preserve permissions");
    }
}
