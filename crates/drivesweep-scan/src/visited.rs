//! Directory identity tracking for link cycle pruning.

use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use dashmap::DashSet;

/// Device and inode of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirIdentity {
    /// Device ID.
    pub device: u64,
    /// Inode number.
    pub inode: u64,
}

impl DirIdentity {
    /// Create a new identity.
    pub fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }

    /// Identity from metadata. None where the platform has no inode numbers.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Option<Self> {
        Some(Self::new(metadata.dev(), metadata.ino()))
    }

    #[cfg(not(unix))]
    pub fn from_metadata(_metadata: &std::fs::Metadata) -> Option<Self> {
        None
    }
}

/// Directories entered during one walk.
///
/// Directory reads happen on several worker threads at once, so both sets
/// are concurrent. A directory whose identity was already entered (reached
/// again through a followed link) is recorded as pruned and not descended.
#[derive(Debug, Default)]
pub struct VisitedDirs {
    seen: DashSet<DirIdentity>,
    pruned: DashSet<PathBuf>,
}

impl VisitedDirs {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a directory. Returns `true` if this is the first time seeing it.
    pub fn track(&self, identity: DirIdentity) -> bool {
        self.seen.insert(identity)
    }

    /// Remember a directory that was not descended into.
    pub fn record_pruned(&self, path: PathBuf) {
        self.pruned.insert(path);
    }

    /// Pruned directories, sorted.
    pub fn pruned(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.pruned.iter().map(|p| p.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Get the number of unique directories tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no directories have been tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
