//! The approval sandbox.
//!
//! Every component that touches the filesystem asks the sandbox first. The
//! allow-list is owned by one [`ApprovalSandbox`] value that callers share
//! explicitly (usually behind an `Arc`); there is no process-wide list.
//!
//! Paths are compared after lexical normalization: they are made absolute,
//! `.` and `..` are resolved without consulting the disk, and on platforms
//! with case-insensitive filesystems the comparison is case-folded. Checks
//! therefore never perform I/O on the path being checked.

use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::drive::Drive;
use crate::error::AccessError;

const CASE_INSENSITIVE: bool = cfg!(any(windows, target_os = "macos"));

/// Make a path absolute and resolve `.`/`..` lexically.
pub fn normalize_path(path: &Path) -> Result<PathBuf, AccessError> {
    if path.as_os_str().is_empty() {
        return Err(AccessError::InvalidPath {
            path: path.to_path_buf(),
        });
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|_| AccessError::InvalidPath {
                path: path.to_path_buf(),
            })?
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    Ok(normalized)
}

fn comparison_key(path: &Path) -> PathBuf {
    if CASE_INSENSITIVE {
        PathBuf::from(path.to_string_lossy().to_lowercase())
    } else {
        path.to_path_buf()
    }
}

/// An immutable view of the allow-list, in approval order.
#[derive(Debug, Clone, Default)]
pub struct ApprovedRoots {
    roots: IndexMap<PathBuf, PathBuf>,
}

impl ApprovedRoots {
    fn insert(&mut self, path: &Path) -> Result<bool, AccessError> {
        let normalized = normalize_path(path)?;
        let key = comparison_key(&normalized);
        if self.roots.contains_key(&key) {
            return Ok(false);
        }
        self.roots.insert(key, normalized);
        Ok(true)
    }

    /// True if `path` equals or descends from an approved root.
    pub fn contains(&self, path: &Path) -> bool {
        let Ok(normalized) = normalize_path(path) else {
            return false;
        };
        let key = comparison_key(&normalized);
        self.roots.keys().any(|root| key.starts_with(root))
    }

    /// Normalize `path` and confirm it is approved.
    pub fn check(&self, path: &Path) -> Result<PathBuf, AccessError> {
        let normalized = normalize_path(path)?;
        if self.roots.keys().any(|root| comparison_key(&normalized).starts_with(root)) {
            Ok(normalized)
        } else {
            Err(AccessError::NotApproved {
                path: path.to_path_buf(),
            })
        }
    }

    /// Approved roots as stored.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.roots.values().map(PathBuf::as_path)
    }

    /// Approved roots with nested entries removed, so no tree is walked twice.
    pub fn outermost(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .filter(|(key, _)| {
                !self
                    .roots
                    .keys()
                    .any(|other| other != *key && key.starts_with(other))
            })
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Number of approved roots.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Check if nothing is approved.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Operator-controlled allow-list gating every filesystem access.
///
/// Approvals are append-only. Searches take a [`snapshot`](Self::snapshot)
/// when they start, so approvals added mid-search apply to the next one.
#[derive(Debug, Default)]
pub struct ApprovalSandbox {
    roots: RwLock<ApprovedRoots>,
}

impl ApprovalSandbox {
    /// Create an empty sandbox. Nothing is approved by default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sandbox with an initial set of roots.
    pub fn with_roots<I, P>(roots: I) -> Result<Self, AccessError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sandbox = Self::new();
        for root in roots {
            sandbox.approve(root)?;
        }
        Ok(sandbox)
    }

    /// Approve a root. Returns `false` if an equivalent path was already approved.
    pub fn approve(&self, path: impl AsRef<Path>) -> Result<bool, AccessError> {
        let path = path.as_ref();
        let added = self
            .roots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path)?;
        if added {
            info!(root = %path.display(), "approved root");
        } else {
            debug!(root = %path.display(), "root already approved");
        }
        Ok(added)
    }

    /// Approve the mount point of every available drive.
    pub fn approve_all(&self, drives: &[Drive]) -> usize {
        drives
            .iter()
            .filter(|drive| drive.available)
            .filter(|drive| matches!(self.approve(&drive.root), Ok(true)))
            .count()
    }

    /// Currently approved roots, in approval order.
    pub fn list_approved_roots(&self) -> Vec<PathBuf> {
        self.snapshot().paths().map(Path::to_path_buf).collect()
    }

    /// True if `path` equals or descends from an approved root.
    pub fn is_approved(&self, path: impl AsRef<Path>) -> bool {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path.as_ref())
    }

    /// Normalize `path` and fail with [`AccessError::NotApproved`] if it is outside the allow-list.
    pub fn check(&self, path: impl AsRef<Path>) -> Result<PathBuf, AccessError> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .check(path.as_ref())
    }

    /// Copy of the allow-list as it is right now.
    pub fn snapshot(&self) -> ApprovedRoots {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of approved roots.
    pub fn len(&self) -> usize {
        self.roots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if nothing is approved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_resolves_dots() {
        let normalized = normalize_path(Path::new("/data/./music/../docs")).unwrap();
        assert_eq!(normalized, PathBuf::from("/data/docs"));

        let at_root = normalize_path(Path::new("/../..")).unwrap();
        assert_eq!(at_root, PathBuf::from("/"));
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(
            normalize_path(Path::new("")),
            Err(AccessError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let normalized = normalize_path(Path::new("some/dir")).unwrap();
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("some/dir"));
    }

    #[test]
    fn test_approve_is_idempotent() {
        let sandbox = ApprovalSandbox::new();
        assert!(sandbox.approve("/data").unwrap());
        assert!(!sandbox.approve("/data").unwrap());
        assert!(!sandbox.approve("/data/./").unwrap());
        assert!(!sandbox.approve("/data/sub/..").unwrap());
        assert_eq!(sandbox.list_approved_roots(), vec![PathBuf::from("/data")]);
    }

    #[test]
    fn test_descendants_are_approved() {
        let sandbox = ApprovalSandbox::with_roots(["/data"]).unwrap();
        assert!(sandbox.is_approved("/data"));
        assert!(sandbox.is_approved("/data/music/a.mp3"));
        assert!(!sandbox.is_approved("/data2/a.mp3"));
        assert!(!sandbox.is_approved("/etc/passwd"));
        assert!(!sandbox.is_approved("/data/../etc/passwd"));
    }

    #[test]
    fn test_check_names_offending_path() {
        let sandbox = ApprovalSandbox::with_roots(["/data"]).unwrap();
        let err = sandbox.check("/srv/file.txt").unwrap_err();
        assert_eq!(
            err,
            AccessError::NotApproved {
                path: PathBuf::from("/srv/file.txt")
            }
        );
        assert_eq!(
            sandbox.check("/data/x/../y.txt").unwrap(),
            PathBuf::from("/data/y.txt")
        );
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_approvals() {
        let sandbox = ApprovalSandbox::with_roots(["/data"]).unwrap();
        let snapshot = sandbox.snapshot();
        sandbox.approve("/media").unwrap();

        assert!(!snapshot.contains(Path::new("/media/x")));
        assert!(sandbox.is_approved("/media/x"));
    }

    #[test]
    fn test_outermost_collapses_nested_roots() {
        let sandbox = ApprovalSandbox::with_roots(["/data/music", "/data", "/media"]).unwrap();
        let outer = sandbox.snapshot().outermost();
        assert_eq!(outer, vec![PathBuf::from("/data"), PathBuf::from("/media")]);
    }

    #[test]
    fn test_sandboxes_do_not_share_state() {
        let first = ApprovalSandbox::with_roots(["/data"]).unwrap();
        let second = ApprovalSandbox::new();
        assert!(first.is_approved("/data/a"));
        assert!(!second.is_approved("/data/a"));
        assert!(second.is_empty());
    }
}
