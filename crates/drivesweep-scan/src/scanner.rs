//! JWalk-based sandboxed extension search.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use globset::GlobSet;
use jwalk::{Parallelism, WalkDir};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use drivesweep_core::{
    ApprovalSandbox, ApprovedRoots, Drive, FileRecord, ScanError, ScanWarning, SearchCriteria,
    SearchOptions, WarningKind, drive_label,
};

use crate::progress::{ProgressTracker, SearchEvent, SearchProgress, SearchSummary};
use crate::visited::{DirIdentity, VisitedDirs};
use crate::SEARCH_CHANNEL_SIZE;

/// How the walk of one root ended.
enum WalkEnd {
    Completed,
    Cancelled,
}

/// Searches approved roots for files with given extensions.
///
/// The scanner never touches a path the sandbox has not approved: scope
/// roots are checked before any I/O and every emitted record is re-checked
/// against the approval snapshot taken when the search started.
pub struct Scanner {
    sandbox: Arc<ApprovalSandbox>,
    options: SearchOptions,
    mounts: Vec<PathBuf>,
}

impl Scanner {
    /// Create a scanner gated by `sandbox`.
    pub fn new(sandbox: Arc<ApprovalSandbox>) -> Self {
        Self {
            sandbox,
            options: SearchOptions::default(),
            mounts: Vec::new(),
        }
    }

    /// Use custom walk options.
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Label records with the drives they live on.
    pub fn with_drives(mut self, drives: &[Drive]) -> Self {
        self.mounts = drives.iter().map(|d| d.root.clone()).collect();
        self
    }

    /// The sandbox gating this scanner.
    pub fn sandbox(&self) -> &Arc<ApprovalSandbox> {
        &self.sandbox
    }

    /// Run a search on the current thread.
    ///
    /// `on_found` receives each matching record as soon as it is discovered,
    /// `on_progress` fires at every directory boundary. `cancel` is checked at
    /// directory boundaries; records emitted before cancellation stay valid.
    pub fn search<F, P>(
        &self,
        criteria: &SearchCriteria,
        mut on_found: F,
        mut on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<SearchSummary, ScanError>
    where
        F: FnMut(FileRecord),
        P: FnMut(&SearchProgress),
    {
        let snapshot = self.sandbox.snapshot();
        let roots = match criteria.scope {
            Some(ref scope) => vec![snapshot.check(scope)?],
            None if snapshot.is_empty() => return Err(ScanError::NoApprovedRoots),
            None => snapshot.outermost(),
        };
        let exclusions = Arc::new(self.options.exclusion_set()?);

        info!(
            roots = roots.len(),
            extensions = ?criteria.extensions,
            subfolders = criteria.include_subfolders,
            "search started"
        );

        let mut tracker = ProgressTracker::new();
        let mut cancelled = false;

        for root in &roots {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let end = self.walk_root(
                root,
                criteria,
                &snapshot,
                &exclusions,
                &mut tracker,
                &mut on_found,
                &mut on_progress,
                cancel,
            );
            if let WalkEnd::Cancelled = end {
                cancelled = true;
                break;
            }
        }

        let summary = tracker.finish(roots, cancelled);
        info!(
            found = summary.total_found,
            dirs = summary.dirs_visited,
            warnings = summary.warnings.len(),
            cancelled = summary.cancelled,
            "search finished"
        );
        Ok(summary)
    }

    /// Run a search and collect the records.
    pub fn search_collect(
        &self,
        criteria: &SearchCriteria,
        cancel: &CancellationToken,
    ) -> Result<(Vec<FileRecord>, SearchSummary), ScanError> {
        let mut records = Vec::new();
        let summary = self.search(criteria, |record| records.push(record), |_| {}, cancel)?;
        Ok((records, summary))
    }

    /// Walk one approved root.
    #[allow(clippy::too_many_arguments)]
    fn walk_root<F, P>(
        &self,
        root: &Path,
        criteria: &SearchCriteria,
        snapshot: &ApprovedRoots,
        exclusions: &Arc<GlobSet>,
        tracker: &mut ProgressTracker,
        on_found: &mut F,
        on_progress: &mut P,
        cancel: &CancellationToken,
    ) -> WalkEnd
    where
        F: FnMut(FileRecord),
        P: FnMut(&SearchProgress),
    {
        let root_metadata = match std::fs::metadata(root) {
            Ok(metadata) if metadata.is_dir() => metadata,
            Ok(_) => {
                warn!(root = %root.display(), "approved root is not a directory, skipped");
                tracker.record_warning(ScanWarning::new(
                    root,
                    format!("Not a directory, skipped: {}", root.display()),
                    WarningKind::ReadError,
                ));
                return WalkEnd::Completed;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(root = %root.display(), "approved root missing, skipped");
                tracker.record_warning(ScanWarning::missing_root(root));
                return WalkEnd::Completed;
            }
            Err(err) => {
                warn!(root = %root.display(), error = %err, "approved root unreadable, skipped");
                tracker.record_warning(ScanWarning::read_error(root, &err));
                return WalkEnd::Completed;
            }
        };

        let visited = Arc::new(VisitedDirs::new());
        if let Some(identity) = DirIdentity::from_metadata(&root_metadata) {
            visited.track(identity);
        }

        let parallelism = match self.options.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };
        let max_depth = if criteria.include_subfolders {
            self.options.effective_max_depth()
        } else {
            1
        };
        let follow_links = self.options.follow_symlinks;
        let prune_exclusions = Arc::clone(exclusions);
        let prune_visited = Arc::clone(&visited);

        let walker = WalkDir::new(root)
            .parallelism(parallelism)
            .skip_hidden(!self.options.include_hidden)
            .follow_links(follow_links)
            .sort(true)
            .min_depth(0)
            .max_depth(max_depth)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        !(entry.file_type().is_dir()
                            && prune_exclusions.is_match(entry.file_name()))
                    }
                    Err(_) => true,
                });

                if !follow_links {
                    return;
                }
                for entry in children.iter_mut().flatten() {
                    if entry.read_children_path.is_none() {
                        continue;
                    }
                    let path = entry.path();
                    let first_visit = std::fs::metadata(&path)
                        .ok()
                        .and_then(|m| DirIdentity::from_metadata(&m))
                        .is_none_or(|identity| prune_visited.track(identity));
                    if !first_visit {
                        entry.read_children_path = None;
                        prune_visited.record_pruned(path);
                    }
                }
            });

        let mut end = WalkEnd::Completed;

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    debug!(path = %path.display(), error = %err, "skipping unreadable entry");
                    tracker.record_warning(walk_warning(&path, &err));
                    continue;
                }
            };

            let file_type = entry.file_type();

            if file_type.is_dir() {
                if cancel.is_cancelled() {
                    end = WalkEnd::Cancelled;
                    break;
                }
                let path = entry.path();
                if let Some(err) = &entry.read_children_error {
                    warn!(dir = %path.display(), error = %err, "directory unreadable, skipped");
                    tracker.record_warning(walk_warning(&path, err));
                } else {
                    debug!(dir = %path.display(), "entering directory");
                }
                tracker.record_dir(path);
                on_progress(&tracker.snapshot());
                continue;
            }

            // Links that were not followed, sockets, devices.
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            if !criteria.matches_path(&path) {
                continue;
            }
            if !snapshot.contains(&path) {
                warn!(path = %path.display(), "walk left the approved roots, record dropped");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracker.record_warning(ScanWarning::new(
                        &path,
                        err.to_string(),
                        WarningKind::MetadataError,
                    ));
                    continue;
                }
            };

            let drive = drive_label(&path, &self.mounts);
            let record = FileRecord::new(
                path,
                metadata.len(),
                metadata.modified().unwrap_or(UNIX_EPOCH),
                drive,
            );
            tracker.record_file(record.size);
            on_found(record);
        }

        for path in visited.pruned() {
            tracker.record_warning(ScanWarning::symlink_cycle(path));
        }

        end
    }
}

fn walk_warning(path: &Path, err: &jwalk::Error) -> ScanWarning {
    if err.loop_ancestor().is_some() {
        ScanWarning::symlink_cycle(path)
    } else if let Some(io) = err.io_error() {
        ScanWarning::read_error(path, io)
    } else {
        ScanWarning::new(path, err.to_string(), WarningKind::ReadError)
    }
}

/// Run a search on a blocking worker and stream its events.
///
/// Must be called from within a tokio runtime. The final event is always
/// [`SearchEvent::Complete`]. Dropping the receiver cancels the search
/// without cancelling `cancel` itself.
pub fn start_search(
    scanner: Arc<Scanner>,
    criteria: SearchCriteria,
    cancel: CancellationToken,
) -> mpsc::Receiver<SearchEvent> {
    let cancel = cancel.child_token();
    let (tx, rx) = mpsc::channel(SEARCH_CHANNEL_SIZE);
    let worker_tx = tx.clone();

    let handle = tokio::task::spawn_blocking(move || {
        let result = scanner.search(
            &criteria,
            |record| {
                if worker_tx.blocking_send(SearchEvent::Found(record)).is_err() {
                    cancel.cancel();
                }
            },
            |progress| {
                if worker_tx
                    .blocking_send(SearchEvent::Progress(progress.clone()))
                    .is_err()
                {
                    cancel.cancel();
                }
            },
            &cancel,
        );
        let _ = worker_tx.blocking_send(SearchEvent::Complete(result));
    });

    tokio::spawn(async move {
        if let Err(err) = handle.await {
            let _ = tx
                .send(SearchEvent::Complete(Err(ScanError::Worker {
                    message: err.to_string(),
                })))
                .await;
        }
    });

    rx
}
