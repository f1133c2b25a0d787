//! Engine error taxonomy.
//!
//! Command-validation failures (`InvalidTransition`, `UnknownTask`, ...) are
//! returned synchronously to the caller and never mutate task state or reach
//! listeners. Transport/storage failures arrive through the task handle and
//! move the task to ERROR instead of surfacing here. Counter inconsistencies
//! are clamped and logged, never raised.

use crate::task::{TaskId, TaskState};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested state change is not in the legal-transition table.
    /// Task state is left unchanged.
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TaskState, to: TaskState },

    /// No task with this id is registered in the engine.
    #[error("unknown task id {0}")]
    UnknownTask(TaskId),

    /// The task was canceled; only `remove` is still meaningful.
    #[error("task {0} was canceled")]
    Canceled(TaskId),

    /// Disk write failed. Not auto-retried since data may be partially written.
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),

    /// ERROR state requires a non-empty error message.
    #[error("entering ERROR requires an error code and message")]
    MissingErrorDetail,

    /// SUCCESS requires all bytes present for known-size non-live tasks;
    /// live/unknown-total tasks must use the explicit finalize signal.
    #[error("cannot mark success: downloaded {downloaded} of {total} bytes")]
    IncompleteSuccess { downloaded: u64, total: u64 },

    /// The configured concurrent-download limit is reached; try again once
    /// a running task finishes.
    #[error("engine at capacity: {0} downloads already active")]
    AtCapacity(usize),
}
