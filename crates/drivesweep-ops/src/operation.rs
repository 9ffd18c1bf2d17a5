//! Batch operation requests and their errors.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use drivesweep_core::{AccessError, FileRecord};

/// What a batch does to its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum OperationKind {
    Copy,
    Move,
    Delete,
}

impl OperationKind {
    /// Past-tense verb used in summaries.
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Copy => "Copied",
            Self::Move => "Moved",
            Self::Delete => "Deleted",
        }
    }

    /// Whether the operation writes into a destination folder.
    pub fn needs_destination(&self) -> bool {
        matches!(self, Self::Copy | Self::Move)
    }
}

/// How deleted files are disposed of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteMode {
    /// Remove the file outright.
    #[default]
    Permanent,
    /// Move the file to the system trash.
    Trash,
}

/// A batch operation over a selection of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub targets: Vec<FileRecord>,
    /// Folder that receives copied or moved files.
    pub destination: Option<PathBuf>,
    #[serde(default)]
    pub delete_mode: DeleteMode,
}

impl OperationRequest {
    /// Copy `targets` into `destination`.
    pub fn copy(targets: Vec<FileRecord>, destination: impl Into<PathBuf>) -> Self {
        Self {
            kind: OperationKind::Copy,
            targets,
            destination: Some(destination.into()),
            delete_mode: DeleteMode::Permanent,
        }
    }

    /// Move `targets` into `destination`.
    pub fn move_to(targets: Vec<FileRecord>, destination: impl Into<PathBuf>) -> Self {
        Self {
            kind: OperationKind::Move,
            targets,
            destination: Some(destination.into()),
            delete_mode: DeleteMode::Permanent,
        }
    }

    /// Delete `targets` permanently.
    pub fn delete(targets: Vec<FileRecord>) -> Self {
        Self {
            kind: OperationKind::Delete,
            targets,
            destination: None,
            delete_mode: DeleteMode::Permanent,
        }
    }

    /// Send deleted files to the trash instead.
    pub fn with_trash(mut self) -> Self {
        self.delete_mode = DeleteMode::Trash;
        self
    }
}

/// Why a single item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemErrorKind {
    NotFound,
    PermissionDenied,
    /// Every numbered name up to the limit was taken.
    CollisionLimit,
    Io,
}

/// A failure confined to one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// The source path of the failed item.
    pub path: PathBuf,
    /// File name shown in error reports.
    pub file_name: String,
    pub kind: ItemErrorKind,
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: impl Into<PathBuf>, kind: ItemErrorKind, message: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            file_name,
            kind,
            message: message.into(),
        }
    }

    /// Classify an I/O failure on `path`.
    pub fn from_io(path: &Path, error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::new(path, ItemErrorKind::NotFound, "File not found"),
            io::ErrorKind::PermissionDenied => {
                Self::new(path, ItemErrorKind::PermissionDenied, "Access denied")
            }
            _ => Self::new(path, ItemErrorKind::Io, error.to_string()),
        }
    }

    /// No free name was found for `path` within `attempts` tries.
    pub fn collision_limit(path: &Path, attempts: usize) -> Self {
        Self::new(
            path,
            ItemErrorKind::CollisionLimit,
            format!("No free file name after {attempts} attempts"),
        )
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.file_name, self.message)
    }
}

/// Problems with a request that stop it before any item is touched.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{kind} requires a destination folder")]
    MissingDestination { kind: OperationKind },

    #[error("Delete does not take a destination folder")]
    UnexpectedDestination,

    #[error("Destination is not a folder: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Destination folder does not exist: {path}")]
    DestinationMissing { path: PathBuf },

    #[error("Failed to create destination folder {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot access destination folder {path}: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors that reject a whole batch.
#[derive(Debug, Error)]
pub enum OpsError {
    /// A target or the destination lies outside the approved roots.
    #[error(transparent)]
    Permission(#[from] AccessError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    /// The executor is already running a batch.
    #[error("Another batch operation is already running")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_uses_file_name() {
        let err = OperationError::new("/data/music/a.mp3", ItemErrorKind::Io, "disk full");
        assert_eq!(err.to_string(), "a.mp3: disk full");
    }

    #[test]
    fn test_from_io_classifies_not_found() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = OperationError::from_io(Path::new("/data/a.txt"), &io_err);
        assert_eq!(err.kind, ItemErrorKind::NotFound);
        assert_eq!(err.to_string(), "a.txt: File not found");
    }

    #[test]
    fn test_request_constructors() {
        let request = OperationRequest::delete(vec![]).with_trash();
        assert_eq!(request.kind, OperationKind::Delete);
        assert_eq!(request.delete_mode, DeleteMode::Trash);
        assert!(request.destination.is_none());

        let request = OperationRequest::copy(vec![], "/backup");
        assert_eq!(request.destination, Some(PathBuf::from("/backup")));
        assert!(request.kind.needs_destination());
    }
}
