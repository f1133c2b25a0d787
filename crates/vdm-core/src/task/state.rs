//! Task lifecycle states and the legal-transition table.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Lifecycle stage of one download task.
///
/// `DEFAULT → PENDING → PREPARE → DOWNLOADING → {SUCCESS | ERROR | PAUSE}`,
/// with PAUSE/ERROR resumable back to PENDING. Anything not in
/// [`TaskState::can_transition`] is rejected with `InvalidTransition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Freshly created or reset; nothing scheduled yet.
    Default,
    /// Queued, waiting for a transport worker.
    Pending,
    /// Worker attached; following redirects / fetching the manifest.
    Prepare,
    /// Bytes or segments are arriving. The only state in which counters advance.
    Downloading,
    /// Interrupted by the user; resumable without losing progress.
    Pause,
    /// Failed with a code and message; resumable via an explicit retry.
    Error,
    /// Terminal.
    Success,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Default => "default",
            TaskState::Pending => "pending",
            TaskState::Prepare => "prepare",
            TaskState::Downloading => "downloading",
            TaskState::Pause => "pause",
            TaskState::Error => "error",
            TaskState::Success => "success",
        }
    }

    /// True for the states between enqueue and first byte (PENDING/PREPARE).
    pub fn is_pending(self) -> bool {
        matches!(self, TaskState::Pending | TaskState::Prepare)
    }

    /// True for PAUSE/ERROR: stopped, but resumable without losing progress.
    pub fn is_interrupted(self) -> bool {
        matches!(self, TaskState::Pause | TaskState::Error)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success)
    }

    /// True while a transport worker may be actively driving the task.
    pub fn is_active(self) -> bool {
        matches!(self, TaskState::Prepare | TaskState::Downloading)
    }

    /// Whether `self -> to` is in the legal-transition table.
    ///
    /// Self-transitions are not transitions; progress ticks during
    /// DOWNLOADING do not pass through here.
    pub fn can_transition(self, to: TaskState) -> bool {
        use TaskState::*;
        match (self, to) {
            (Default, Pending) => true,
            (Pending, Prepare) | (Pending, Pause) | (Pending, Error) => true,
            (Prepare, Downloading) | (Prepare, Pause) | (Prepare, Error) => true,
            (Downloading, Success) | (Downloading, Error) | (Downloading, Pause) => true,
            // Resume and retry re-enter the queue.
            (Pause, Pending) | (Error, Pending) => true,
            _ => false,
        }
    }

    /// Validates `self -> to`, returning the unchanged-state error on refusal.
    pub fn check_transition(self, to: TaskState) -> Result<(), EngineError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition { from: self, to })
        }
    }
}
