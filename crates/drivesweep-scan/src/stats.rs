//! Aggregate figures for a result set.

use std::collections::BTreeMap;

use serde::Serialize;

use drivesweep_core::FileRecord;

/// Count and size of the files sharing one extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionStats {
    pub files: u64,
    pub bytes: u64,
}

/// Totals over a set of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStatistics {
    /// Number of records.
    pub total_files: u64,
    /// Sum of record sizes.
    pub total_bytes: u64,
    /// Breakdown keyed by lower-cased extension without the dot.
    pub by_extension: BTreeMap<String, ExtensionStats>,
}

impl SearchStatistics {
    /// Compute statistics over `records`.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.add(record);
        }
        stats
    }

    /// Fold one record into the totals.
    pub fn add(&mut self, record: &FileRecord) {
        self.total_files += 1;
        self.total_bytes += record.size;
        let key = record.extension.trim_start_matches('.').to_lowercase();
        let entry = self.by_extension.entry(key).or_default();
        entry.files += 1;
        entry.bytes += record.size;
    }

    /// Extensions ordered by file count, largest first.
    pub fn top_extensions(&self) -> Vec<(&str, ExtensionStats)> {
        let mut entries: Vec<_> = self
            .by_extension
            .iter()
            .map(|(ext, stats)| (ext.as_str(), *stats))
            .collect();
        entries.sort_by(|a, b| b.1.files.cmp(&a.1.files).then_with(|| a.0.cmp(b.0)));
        entries
    }
}
