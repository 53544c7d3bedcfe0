// src/task/mod.rs

//! Cancellable background tasks that launch one external process.
//!
//! - [`runner`] is the public entry point: `TaskRunner::submit` returns a
//!   `TaskHandle` offering `request_cancel`, `on_complete` and `wait`.
//! - [`scheduler`] decides where task bodies run (`TokioScheduler` in
//!   production).
//! - [`shared`] is the state both the task body and the cancellation path
//!   touch: the cancellation flag, the published process handle, the state
//!   channel and the completion callbacks.
//! - [`background`] is the task body itself.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::exec::CapturedOutput;

pub mod background;
pub mod runner;
pub mod scheduler;
pub mod shared;

pub use runner::{Services, TaskHandle, TaskRunner};
pub use scheduler::{Job, Scheduler, TokioScheduler};

/// Identifier of a submitted task, unique per `TaskRunner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a task. Transitions only move forward:
///
/// ```text
/// Pending -> Running -> Cancelling -> Cancelled
///    |          |            \-----> Completed | Failed
///    |          \--> Completed | Failed | Cancelled
///    \--> Cancelling
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Submitted; the body has not started yet.
    Pending,
    /// The body is executing; a process may or may not exist yet.
    Running,
    /// Cancellation was requested and has not been resolved yet.
    Cancelling,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// Position in the forward-only ordering. Terminal states share a rank,
    /// so none of them can follow another.
    pub(crate) fn rank(self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Running => 1,
            TaskState::Cancelling => 2,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled => 3,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Cancelling => "cancelling",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why a task ended in [`TaskState::Failed`].
///
/// Cancellation is not an error and has no variant here.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    /// No toolchain could be resolved; nothing was spawned.
    #[error("no toolchain configured for context '{context}' (needed to run `{executable}`)")]
    Configuration { context: String, executable: String },

    /// The OS refused to start the process.
    #[error("failed to start `{}`: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// The process ran and exited with a code not counted as success.
    /// `output` is present when output-on-error was requested.
    #[error("`{label}` exited with code {code}")]
    RuntimeFailure {
        label: String,
        code: i32,
        output: Option<CapturedOutput>,
    },
}

/// Final result of a task, handed to completion callbacks.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub id: TaskId,
    pub label: String,
    /// Always terminal.
    pub state: TaskState,
    /// Exit code, when the process exited on its own.
    pub exit_code: Option<i32>,
    pub error: Option<TaskError>,
    /// Whether a process was ever spawned for this task.
    pub spawned: bool,
}

impl TaskReport {
    pub(crate) fn new(id: TaskId, label: impl Into<String>, state: TaskState) -> Self {
        Self {
            id,
            label: label.into(),
            state,
            exit_code: None,
            error: None,
            spawned: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == TaskState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_share_a_rank() {
        let terminal = [TaskState::Completed, TaskState::Failed, TaskState::Cancelled];
        for a in terminal {
            assert!(a.is_terminal());
            for b in terminal {
                assert_eq!(a.rank(), b.rank());
            }
        }
        assert!(TaskState::Cancelling.rank() > TaskState::Running.rank());
        assert!(!TaskState::Cancelling.is_terminal());
    }

    #[test]
    fn spawn_error_names_the_program() {
        let err = TaskError::Spawn {
            program: PathBuf::from("/opt/go/bin/go"),
            source: Arc::new(io::Error::new(io::ErrorKind::NotFound, "not found")),
        };
        assert_eq!(err.to_string(), "failed to start `/opt/go/bin/go`: not found");
    }
}
