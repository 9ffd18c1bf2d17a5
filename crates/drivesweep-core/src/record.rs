//! Discovered file records.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A file found by a search.
///
/// Records are transient: a new search replaces them and nothing persists
/// them besides an explicit export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// File name including the extension.
    pub name: CompactString,
    /// Extension as found on disk, with its leading dot (empty if none).
    pub extension: CompactString,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Label of the drive that holds the file.
    pub drive: CompactString,
}

impl FileRecord {
    /// Build a record from a path and the facts read from its metadata.
    pub fn new(
        path: impl Into<PathBuf>,
        size: u64,
        modified: SystemTime,
        drive: impl Into<CompactString>,
    ) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_default();
        let extension = extension_of(&path);
        Self {
            path,
            name,
            extension,
            size,
            modified,
            drive: drive.into(),
        }
    }

    /// Last modification time in the local timezone.
    pub fn modified_local(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.modified)
    }

    /// Human-readable size (`512 bytes`, `1.5 KB`, `3.25 MB`, `1.20 GB`).
    pub fn display_size(&self) -> String {
        const KB: f64 = 1024.0;
        const MB: f64 = KB * 1024.0;
        let mb = self.size as f64 / MB;
        if mb < 0.001 {
            format!("{} bytes", self.size)
        } else if mb < 1.0 {
            format!("{:.1} KB", self.size as f64 / KB)
        } else if mb < 1024.0 {
            format!("{mb:.2} MB")
        } else {
            format!("{:.2} GB", mb / 1024.0)
        }
    }
}

fn extension_of(path: &Path) -> CompactString {
    path.extension()
        .map(|ext| CompactString::new(format!(".{}", ext.to_string_lossy())))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields_from_path() {
        let record = FileRecord::new("/data/music/Track.MP3", 42, SystemTime::UNIX_EPOCH, "/");
        assert_eq!(record.name.as_str(), "Track.MP3");
        assert_eq!(record.extension.as_str(), ".MP3");
        assert_eq!(record.drive.as_str(), "/");
    }

    #[test]
    fn test_record_without_extension() {
        let record = FileRecord::new("/data/Makefile", 1, SystemTime::UNIX_EPOCH, "/");
        assert!(record.extension.is_empty());
    }

    #[test]
    fn test_display_size_thresholds() {
        let at = |size| FileRecord::new("/f.bin", size, SystemTime::UNIX_EPOCH, "/").display_size();
        assert_eq!(at(512), "512 bytes");
        assert_eq!(at(1536), "1.5 KB");
        assert_eq!(at(3 * 1024 * 1024 + 256 * 1024), "3.25 MB");
        assert_eq!(at(2 * 1024 * 1024 * 1024), "2.00 GB");
    }
}
