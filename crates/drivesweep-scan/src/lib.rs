//! Search engine for drivesweep.
//!
//! This crate walks the roots approved in an [`ApprovalSandbox`] and reports
//! every file whose extension matches a [`SearchCriteria`].
//!
//! # Overview
//!
//! - **Parallel directory reads** via jwalk/rayon
//! - **Streaming results**: each record is handed out as soon as it is found
//! - **Cancellation** at directory boundaries via [`CancellationToken`]
//! - **Link cycle pruning** when symbolic links are followed
//! - **CSV and JSON export** of a result set
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drivesweep_scan::{ApprovalSandbox, CancellationToken, Scanner, SearchCriteria};
//!
//! let sandbox = Arc::new(ApprovalSandbox::with_roots(["/data"]).unwrap());
//! let scanner = Scanner::new(sandbox);
//! let criteria = SearchCriteria::new(["mp3", "flac"]).unwrap();
//!
//! let summary = scanner
//!     .search(
//!         &criteria,
//!         |record| println!("{}", record.path.display()),
//!         |_| {},
//!         &CancellationToken::new(),
//!     )
//!     .unwrap();
//!
//! println!("{} files", summary.total_found);
//! ```
//!
//! # Streaming
//!
//! [`start_search`] runs the walk on a blocking worker and yields
//! [`SearchEvent`]s over a channel:
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use drivesweep_scan::*;
//! # async fn run(scanner: Arc<Scanner>, criteria: SearchCriteria) {
//! let mut events = start_search(scanner, criteria, CancellationToken::new());
//! while let Some(event) = events.recv().await {
//!     if let SearchEvent::Found(record) = event {
//!         println!("{}", record.name);
//!     }
//! }
//! # }
//! ```

mod export;
mod progress;
mod scanner;
mod stats;
mod visited;

pub use export::{CSV_HEADER, ExportError, TIMESTAMP_FORMAT, export_csv, export_json, write_csv};
pub use progress::{SearchEvent, SearchProgress, SearchSummary};
pub use scanner::{Scanner, start_search};
pub use stats::{ExtensionStats, SearchStatistics};
pub use visited::{DirIdentity, VisitedDirs};

pub use tokio_util::sync::CancellationToken;

// Re-export core types for convenience
pub use drivesweep_core::{
    ApprovalSandbox, Drive, DriveCatalog, ExtensionCategory, FileRecord, ScanError, ScanWarning,
    SearchCriteria, SearchOptions, WarningKind,
};

/// Capacity of the event channel returned by [`start_search`].
pub const SEARCH_CHANNEL_SIZE: usize = 256;
