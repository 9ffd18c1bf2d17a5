//! Batch operation engine for drivesweep.
//!
//! This crate copies, moves and deletes selections of search results. Every
//! path is checked against the approval sandbox before anything is touched,
//! each file then succeeds or fails on its own, and progress is reported
//! after every item through a callback or a channel.
//!
//! Existing files are never overwritten: a taken destination name becomes
//! `name (1).ext`, `name (2).ext` and so on.

mod conflict;
mod copy;
mod delete;
mod executor;
mod move_op;
mod operation;
mod progress;

pub use conflict::{MAX_RENAME_ATTEMPTS, numbered_name};
pub use executor::{BatchExecutor, ExecutorOptions, OperationEvent, start_execute};
pub use operation::{
    DeleteMode, ItemErrorKind, OperationError, OperationKind, OperationRequest, OpsError,
    SetupError,
};
pub use progress::{
    ERROR_REPORT_LIMIT, ErrorReport, ExecutionState, ItemOutcome, ItemStatus, OperationOutcome,
    OperationProgress,
};

/// Default channel buffer size for operation progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
