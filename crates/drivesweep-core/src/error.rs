//! Error types for sandbox checks and searches.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the approval sandbox.
///
/// These are always produced before any filesystem access to the offending
/// path takes place.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The path lies outside every approved root.
    #[error("Permission denied: {path} is not under an approved root")]
    NotApproved { path: PathBuf },

    /// The path is empty or cannot be made absolute.
    #[error("Invalid path: {path:?}")]
    InvalidPath { path: PathBuf },
}

impl AccessError {
    /// The path that was rejected.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotApproved { path } | Self::InvalidPath { path } => path,
        }
    }
}

/// Errors that abort a search before it produces any records.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A requested root was rejected by the sandbox.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Nothing is approved and no scope was given.
    #[error("No approved roots to search")]
    NoApprovedRoots,

    /// An exclusion pattern failed to compile.
    #[error("Invalid exclusion pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Invalid search criteria.
    #[error("Invalid search criteria: {message}")]
    InvalidCriteria { message: String },

    /// The background search worker stopped unexpectedly.
    #[error("Search worker failed: {message}")]
    Worker { message: String },
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// An approved root did not exist at scan time.
    MissingRoot,
    /// A followed link led back into an already visited directory.
    SymlinkCycle,
}

/// Non-fatal warning encountered during a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a permission denied warning.
    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Permission denied: {}", path.display()),
            path,
            kind: WarningKind::PermissionDenied,
        }
    }

    /// Create a warning for an unreadable directory, classifying denied access.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        if error.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::permission_denied(path);
        }
        Self {
            message: format!("Read error: {error}"),
            path,
            kind: WarningKind::ReadError,
        }
    }

    /// Create a warning for an approved root that is gone.
    pub fn missing_root(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Approved root not found, skipped: {}", path.display()),
            path,
            kind: WarningKind::MissingRoot,
        }
    }

    /// Create a warning for a pruned link cycle.
    pub fn symlink_cycle(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Link cycle, not descending: {}", path.display()),
            path,
            kind: WarningKind::SymlinkCycle,
        }
    }
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
