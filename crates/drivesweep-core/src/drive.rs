//! Storage volume enumeration.

use std::path::{Component, Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use sysinfo::{DiskKind, Disks};
use tracing::{debug, warn};

/// File systems reported for network mounts.
const NETWORK_FILESYSTEMS: &[&str] = &[
    "nfs", "nfs4", "cifs", "smbfs", "smb2", "smb3", "afpfs", "sshfs", "fuse.sshfs", "9p", "webdav",
    "davfs",
];

/// The broad class of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum DriveKind {
    Fixed,
    Removable,
    Network,
    Unknown,
}

impl DriveKind {
    /// Classify a volume from its file system name and removable flag.
    pub fn classify(file_system: &str, removable: bool) -> Self {
        let fs = file_system.to_ascii_lowercase();
        if NETWORK_FILESYSTEMS.contains(&fs.as_str()) {
            Self::Network
        } else if removable {
            Self::Removable
        } else if fs.is_empty() {
            Self::Unknown
        } else {
            Self::Fixed
        }
    }
}

/// Snapshot of one mounted volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    /// Mount point (or drive root such as `C:\`).
    pub root: PathBuf,
    /// Volume label, falling back to the device name.
    pub label: String,
    /// Kind of volume.
    pub kind: DriveKind,
    /// File system name as reported by the OS.
    pub file_system: String,
    /// Total capacity in bytes.
    pub total_bytes: u64,
    /// Free space available to the current user in bytes.
    pub free_bytes: u64,
    /// Whether the volume could be read when it was listed.
    pub available: bool,
}

impl Drive {
    /// One-line description, e.g. `/mnt/usb (BACKUP) - Removable - 29.7 GB Total`.
    pub fn display_name(&self) -> String {
        let gb = self.total_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
        let mut name = format!(
            "{} ({}) - {} - {gb:.1} GB Total",
            self.root.display(),
            self.label,
            self.kind
        );
        if !self.available {
            name.push_str(" [unavailable]");
        }
        name
    }
}

/// Queries the operating system for mounted volumes.
///
/// Every call re-reads the volume table; nothing is cached.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriveCatalog;

impl DriveCatalog {
    /// Create a catalog.
    pub fn new() -> Self {
        Self
    }

    /// List mounted volumes.
    ///
    /// A volume that cannot be read is still listed, with `available = false`.
    pub fn list_drives(&self) -> Vec<Drive> {
        let disks = Disks::new_with_refreshed_list();
        let drives: Vec<Drive> = disks
            .list()
            .iter()
            .map(|disk| {
                let root = disk.mount_point().to_path_buf();
                let file_system = disk.file_system().to_string_lossy().to_string();
                let mut kind = DriveKind::classify(&file_system, disk.is_removable());
                if kind == DriveKind::Fixed && matches!(disk.kind(), DiskKind::Unknown(_)) {
                    kind = DriveKind::Unknown;
                }

                let available = match std::fs::read_dir(&root) {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(root = %root.display(), error = %err, "drive not readable");
                        false
                    }
                };

                let name = disk.name().to_string_lossy();
                let label = if name.trim().is_empty() {
                    root_label(&root).to_string()
                } else {
                    name.to_string()
                };

                Drive {
                    root,
                    label,
                    kind,
                    file_system,
                    total_bytes: disk.total_space(),
                    free_bytes: disk.available_space(),
                    available,
                }
            })
            .collect();

        debug!(count = drives.len(), "listed drives");
        drives
    }
}

/// Label of the drive owning `path`: the longest mount point containing it,
/// or the path's root component when no mount point matches.
pub fn drive_label(path: &Path, mounts: &[PathBuf]) -> CompactString {
    match mounts
        .iter()
        .filter(|mount| path.starts_with(mount))
        .max_by_key(|mount| mount.components().count())
    {
        Some(mount) => root_label(mount),
        None => {
            let root: PathBuf = path
                .components()
                .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
                .collect();
            root_label(&root)
        }
    }
}

/// `C:\` becomes `C:`, `/` stays `/`, `/mnt/usb/` becomes `/mnt/usb`.
fn root_label(path: &Path) -> CompactString {
    let display = path.to_string_lossy();
    let trimmed = display.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        CompactString::new("/")
    } else {
        CompactString::new(trimmed)
    }
}
