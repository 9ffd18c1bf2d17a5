//! Progress and outcome types for batch operations.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use drivesweep_core::FileRecord;

use crate::operation::{OperationError, OperationKind};

/// Error lines kept by [`OperationOutcome::error_report`] by default.
pub const ERROR_REPORT_LIMIT: usize = 10;

/// Lifecycle of a batch executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum ExecutionState {
    Idle,
    Running,
    Completed,
    Cancelled,
    /// Rejected before any item was processed.
    Failed,
}

/// Progress information for a running batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationProgress {
    pub kind: OperationKind,
    /// Items finished so far, successfully or not.
    pub processed: usize,
    pub total: usize,
    /// Name of the item finished last.
    pub current_file: Option<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_processed: u64,
}

impl OperationProgress {
    /// Create a new progress tracker for a batch.
    pub fn new(kind: OperationKind, total: usize) -> Self {
        Self {
            kind,
            processed: 0,
            total,
            current_file: None,
            succeeded: 0,
            failed: 0,
            bytes_processed: 0,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.processed as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }

    pub(crate) fn record_success(&mut self, bytes: u64) {
        self.processed += 1;
        self.succeeded += 1;
        self.bytes_processed += bytes;
    }

    pub(crate) fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Succeeded {
        /// Where the file ended up (None for deletes).
        destination: Option<PathBuf>,
        bytes: u64,
    },
    Failed(OperationError),
    /// Skipped because the batch was cancelled first.
    Unprocessed,
}

/// One target and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub source: PathBuf,
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ItemStatus::Succeeded { .. })
    }
}

/// The first errors of a batch, plus how many were left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub lines: Vec<String>,
    pub remaining: usize,
}

impl ErrorReport {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        if self.remaining > 0 {
            writeln!(f, "... and {} more errors", self.remaining)?;
        }
        Ok(())
    }
}

/// Result of an executed batch.
///
/// `succeeded + failed + unprocessed == attempted` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub kind: OperationKind,
    /// Per-target results in request order.
    pub items: Vec<ItemOutcome>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unprocessed: usize,
    pub cancelled: bool,
    pub bytes_processed: u64,
    pub elapsed: Duration,
}

impl OperationOutcome {
    pub(crate) fn from_items(
        kind: OperationKind,
        items: Vec<ItemOutcome>,
        cancelled: bool,
        elapsed: Duration,
    ) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut unprocessed = 0;
        let mut bytes_processed = 0;
        for item in &items {
            match item.status {
                ItemStatus::Succeeded { bytes, .. } => {
                    succeeded += 1;
                    bytes_processed += bytes;
                }
                ItemStatus::Failed(_) => failed += 1,
                ItemStatus::Unprocessed => unprocessed += 1,
            }
        }
        Self {
            kind,
            attempted: items.len(),
            items,
            succeeded,
            failed,
            unprocessed,
            cancelled,
            bytes_processed,
            elapsed,
        }
    }

    /// Final state of the batch.
    pub fn state(&self) -> ExecutionState {
        if self.cancelled {
            ExecutionState::Cancelled
        } else {
            ExecutionState::Completed
        }
    }

    /// Check if every target was processed without error.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.unprocessed == 0
    }

    /// Per-item errors in request order.
    pub fn errors(&self) -> impl Iterator<Item = &OperationError> {
        self.items.iter().filter_map(|item| match &item.status {
            ItemStatus::Failed(err) => Some(err),
            _ => None,
        })
    }

    /// Sources that were copied, moved or deleted.
    pub fn succeeded_sources(&self) -> impl Iterator<Item = &Path> {
        self.items
            .iter()
            .filter(|item| item.is_success())
            .map(|item| item.source.as_path())
    }

    /// At most `limit` error lines (`file: message`) and the count left out.
    pub fn error_report(&self, limit: usize) -> ErrorReport {
        let lines: Vec<String> = self.errors().take(limit).map(|e| e.to_string()).collect();
        ErrorReport {
            remaining: self.failed.saturating_sub(lines.len()),
            lines,
        }
    }

    /// Drop the records whose files are gone after this batch.
    ///
    /// Moved and deleted files are removed from `records`; a copy leaves the
    /// list untouched.
    pub fn retain_unsucceeded(&self, records: &mut Vec<FileRecord>) {
        if self.kind == OperationKind::Copy {
            return;
        }
        let done: HashSet<&Path> = self.succeeded_sources().collect();
        records.retain(|record| !done.contains(record.path.as_path()));
    }

    /// Get a human-readable summary of the batch.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} {} of {} files",
            self.kind.past_tense(),
            self.succeeded,
            self.attempted
        );
        if self.failed > 0 {
            text.push_str(&format!(", {} failed", self.failed));
        }
        if self.cancelled {
            text.push_str(&format!(", cancelled with {} not processed", self.unprocessed));
        }
        text
    }
}
