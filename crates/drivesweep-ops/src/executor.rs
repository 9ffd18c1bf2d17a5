//! Batch executor with sandbox pre-flight and per-item failure boundaries.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use drivesweep_core::ApprovalSandbox;

use crate::OPERATION_CHANNEL_SIZE;
use crate::conflict::MAX_RENAME_ATTEMPTS;
use crate::copy::{CopyOptions, copy_into};
use crate::delete::delete_file;
use crate::move_op::move_into;
use crate::operation::{
    DeleteMode, ItemErrorKind, OperationError, OperationKind, OperationRequest, OpsError,
    SetupError,
};
use crate::progress::{ExecutionState, ItemOutcome, ItemStatus, OperationOutcome, OperationProgress};

/// Executor settings.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    /// Numbered names tried when a destination name is taken.
    pub max_rename_attempts: usize,
    /// Keep modification times and permissions on copies.
    pub preserve_metadata: bool,
    /// Create a missing destination folder instead of rejecting the batch.
    pub create_destination: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_rename_attempts: MAX_RENAME_ATTEMPTS,
            preserve_metadata: true,
            create_destination: true,
        }
    }
}

impl ExecutorOptions {
    fn copy_options(&self) -> CopyOptions {
        CopyOptions {
            max_rename_attempts: self.max_rename_attempts,
            preserve_metadata: self.preserve_metadata,
        }
    }
}

/// Event streamed by [`start_execute`].
#[derive(Debug)]
pub enum OperationEvent {
    /// Sent after each item.
    Progress(OperationProgress),
    /// The batch finished or was rejected. Always the last event.
    Complete(Result<OperationOutcome, OpsError>),
}

/// Marks the executor busy for as long as it lives.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs copy, move and delete batches over approved files.
///
/// One batch runs at a time per executor; a second concurrent call is
/// rejected with [`OpsError::Busy`].
#[derive(Debug)]
pub struct BatchExecutor {
    sandbox: Arc<ApprovalSandbox>,
    options: ExecutorOptions,
    running: AtomicBool,
    last_state: Mutex<ExecutionState>,
}

impl BatchExecutor {
    /// Create an executor gated by `sandbox`.
    pub fn new(sandbox: Arc<ApprovalSandbox>) -> Self {
        Self::with_options(sandbox, ExecutorOptions::default())
    }

    /// Create an executor with custom options.
    pub fn with_options(sandbox: Arc<ApprovalSandbox>, options: ExecutorOptions) -> Self {
        Self {
            sandbox,
            options,
            running: AtomicBool::new(false),
            last_state: Mutex::new(ExecutionState::Idle),
        }
    }

    /// Check if a batch is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current state: running, or how the last batch ended.
    pub fn state(&self) -> ExecutionState {
        if self.is_running() {
            ExecutionState::Running
        } else {
            *self.last_state.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    fn set_state(&self, state: ExecutionState) {
        *self.last_state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Execute a batch.
    ///
    /// Every target and the destination are checked against the sandbox
    /// before anything is touched; a rejected path fails the whole batch.
    /// After that each item succeeds or fails on its own, `on_progress` is
    /// called after every item, and `cancel` is checked before every item.
    /// Cancellation leaves completed items in place.
    pub async fn execute<P>(
        &self,
        request: OperationRequest,
        mut on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<OperationOutcome, OpsError>
    where
        P: FnMut(&OperationProgress) + Send,
    {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            warn!(kind = %request.kind, "batch rejected, executor busy");
            return Err(OpsError::Busy);
        };

        let result = self.run(request, &mut on_progress, cancel).await;
        self.set_state(match &result {
            Ok(outcome) => outcome.state(),
            Err(_) => ExecutionState::Failed,
        });
        result
    }

    async fn run<P>(
        &self,
        request: OperationRequest,
        on_progress: &mut P,
        cancel: &CancellationToken,
    ) -> Result<OperationOutcome, OpsError>
    where
        P: FnMut(&OperationProgress) + Send,
    {
        let start = Instant::now();
        let (checked, destination) = self.preflight(&request)?;
        let kind = request.kind;
        let total = request.targets.len();

        info!(%kind, total, destination = ?destination, "batch started");

        let mut progress = OperationProgress::new(kind, total);
        let mut items = Vec::with_capacity(total);
        let mut cancelled = false;
        let mut targets = request.targets.into_iter().zip(checked);

        for (record, checked_path) in targets.by_ref() {
            if cancel.is_cancelled() {
                cancelled = true;
                items.push(ItemOutcome {
                    source: record.path,
                    status: ItemStatus::Unprocessed,
                });
                break;
            }

            let status = self
                .process(kind, checked_path, destination.clone(), request.delete_mode)
                .await;
            match &status {
                ItemStatus::Succeeded { bytes, .. } => progress.record_success(*bytes),
                ItemStatus::Failed(err) => {
                    warn!(path = %record.path.display(), error = %err.message, "item failed");
                    progress.record_failure();
                }
                ItemStatus::Unprocessed => {}
            }
            progress.current_file = Some(record.name.to_string());
            items.push(ItemOutcome {
                source: record.path,
                status,
            });
            on_progress(&progress);
        }

        items.extend(targets.map(|(record, _)| ItemOutcome {
            source: record.path,
            status: ItemStatus::Unprocessed,
        }));

        let outcome = OperationOutcome::from_items(kind, items, cancelled, start.elapsed());
        info!(
            %kind,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            unprocessed = outcome.unprocessed,
            cancelled = outcome.cancelled,
            "batch finished"
        );
        Ok(outcome)
    }

    /// Validate the request and prepare the destination folder.
    ///
    /// Returns the checked target paths in request order. Items are processed
    /// through these, never through the raw request paths.
    fn preflight(
        &self,
        request: &OperationRequest,
    ) -> Result<(Vec<PathBuf>, Option<PathBuf>), OpsError> {
        let snapshot = self.sandbox.snapshot();
        let checked = request
            .targets
            .iter()
            .map(|record| snapshot.check(&record.path))
            .collect::<Result<Vec<_>, _>>()?;

        let destination = match (request.kind.needs_destination(), &request.destination) {
            (false, None) => return Ok((checked, None)),
            (false, Some(_)) => return Err(SetupError::UnexpectedDestination.into()),
            (true, None) => {
                return Err(SetupError::MissingDestination { kind: request.kind }.into());
            }
            (true, Some(dest)) => snapshot.check(dest)?,
        };

        self.prepare_destination(&destination)?;
        Ok((checked, Some(destination)))
    }

    fn prepare_destination(&self, destination: &Path) -> Result<(), SetupError> {
        match std::fs::metadata(destination) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(SetupError::NotADirectory {
                path: destination.to_path_buf(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if !self.options.create_destination {
                    return Err(SetupError::DestinationMissing {
                        path: destination.to_path_buf(),
                    });
                }
                std::fs::create_dir_all(destination).map_err(|source| {
                    SetupError::CreateDestination {
                        path: destination.to_path_buf(),
                        source,
                    }
                })?;
                debug!(path = %destination.display(), "created destination folder");
                Ok(())
            }
            Err(source) => Err(SetupError::Inaccessible {
                path: destination.to_path_buf(),
                source,
            }),
        }
    }

    /// Process one item on a blocking worker.
    async fn process(
        &self,
        kind: OperationKind,
        source: PathBuf,
        destination: Option<PathBuf>,
        delete_mode: DeleteMode,
    ) -> ItemStatus {
        let copy_options = self.options.copy_options();
        let task_source = source.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let source = task_source.as_path();
            match (kind, destination) {
                (OperationKind::Delete, _) => {
                    delete_file(source, delete_mode).map(|bytes| (None, bytes))
                }
                (OperationKind::Copy, Some(dest)) => {
                    copy_into(source, &dest, copy_options).map(|(to, bytes)| (Some(to), bytes))
                }
                (OperationKind::Move, Some(dest)) => {
                    move_into(source, &dest, copy_options).map(|(to, bytes)| (Some(to), bytes))
                }
                (_, None) => Err(OperationError::new(
                    source,
                    ItemErrorKind::Io,
                    "No destination folder",
                )),
            }
        })
        .await;

        match joined {
            Ok(Ok((destination, bytes))) => ItemStatus::Succeeded { destination, bytes },
            Ok(Err(err)) => ItemStatus::Failed(err),
            Err(err) => ItemStatus::Failed(OperationError::new(
                source,
                ItemErrorKind::Io,
                format!("Worker failed: {err}"),
            )),
        }
    }
}

/// Run a batch on a spawned task and stream its events.
///
/// Progress events are dropped rather than awaited when the receiver falls
/// behind; the final [`OperationEvent::Complete`] is always delivered while
/// the receiver is alive.
pub fn start_execute(
    executor: Arc<BatchExecutor>,
    request: OperationRequest,
    cancel: CancellationToken,
) -> mpsc::Receiver<OperationEvent> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let result = executor
            .execute(
                request,
                move |progress| {
                    let _ = progress_tx.try_send(OperationEvent::Progress(progress.clone()));
                },
                &cancel,
            )
            .await;
        let _ = tx.send(OperationEvent::Complete(result)).await;
    });

    rx
}
