//! Search progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use drivesweep_core::{FileRecord, ScanError, ScanWarning};

/// Progress information during a search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchProgress {
    /// Matching files found so far.
    pub files_found: u64,
    /// Directories entered so far.
    pub dirs_visited: u64,
    /// Total bytes of matching files so far.
    pub bytes_found: u64,
    /// Directory currently being visited.
    pub current_dir: PathBuf,
    /// Number of warnings encountered.
    pub warnings_count: u64,
    /// Time elapsed since the search started.
    pub elapsed: Duration,
}

impl SearchProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_found: 0,
            dirs_visited: 0,
            bytes_found: 0,
            current_dir: PathBuf::new(),
            warnings_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Directories visited per second.
    pub fn dirs_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.dirs_visited as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for SearchProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Final report of one search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    /// Roots that were walked.
    pub roots: Vec<PathBuf>,
    /// Matching files emitted.
    pub total_found: u64,
    /// Directories entered.
    pub dirs_visited: u64,
    /// Total bytes of matching files.
    pub total_bytes: u64,
    /// Non-fatal problems: unreadable directories, missing roots, pruned cycles.
    pub warnings: Vec<ScanWarning>,
    /// The search stopped early on request.
    pub cancelled: bool,
    /// Wall time of the search.
    pub elapsed: Duration,
}

/// Event streamed by [`start_search`](crate::start_search).
#[derive(Debug)]
pub enum SearchEvent {
    /// A matching file.
    Found(FileRecord),
    /// Periodic progress at a directory boundary.
    Progress(SearchProgress),
    /// The search finished. Always the last event.
    Complete(Result<SearchSummary, ScanError>),
}

/// Running counters for one search.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_found: u64,
    dirs_visited: u64,
    bytes_found: u64,
    current_dir: PathBuf,
    warnings: Vec<ScanWarning>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_found: 0,
            dirs_visited: 0,
            bytes_found: 0,
            current_dir: PathBuf::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_file(&mut self, size: u64) {
        self.files_found += 1;
        self.bytes_found += size;
    }

    pub fn record_dir(&mut self, path: PathBuf) {
        self.dirs_visited += 1;
        self.current_dir = path;
    }

    pub fn record_warning(&mut self, warning: ScanWarning) {
        self.warnings.push(warning);
    }

    pub fn snapshot(&self) -> SearchProgress {
        SearchProgress {
            files_found: self.files_found,
            dirs_visited: self.dirs_visited,
            bytes_found: self.bytes_found,
            current_dir: self.current_dir.clone(),
            warnings_count: self.warnings.len() as u64,
            elapsed: self.start_time.elapsed(),
        }
    }

    pub fn finish(self, roots: Vec<PathBuf>, cancelled: bool) -> SearchSummary {
        SearchSummary {
            roots,
            total_found: self.files_found,
            dirs_visited: self.dirs_visited,
            total_bytes: self.bytes_found,
            warnings: self.warnings,
            cancelled,
            elapsed: self.start_time.elapsed(),
        }
    }
}
