// src/task/shared.rs

//! State shared between a task body and the threads that may cancel it.
//!
//! Ordering contract between [`TaskShared::request_cancel`] and
//! [`TaskShared::publish`]:
//!
//! - `request_cancel` sets the flag, then inspects the process slot under
//!   its mutex.
//! - `publish` reads the flag under the same mutex it stores the handle
//!   with.
//!
//! Whichever side takes the mutex second sees the other's write, so a
//! published handle is always destroyed once cancellation has been
//! requested. The body's earlier checkpoint read of the flag only decides
//! whether to spawn at all.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::exec::ProcessHandle;

use super::{TaskId, TaskReport, TaskState};

pub type CompletionCallback = Box<dyn FnOnce(&TaskReport) + Send + 'static>;

#[derive(Default)]
struct Completion {
    report: Option<TaskReport>,
    callbacks: Vec<CompletionCallback>,
}

pub(crate) struct TaskShared {
    id: TaskId,
    label: String,
    /// Set once, never cleared.
    cancel_requested: AtomicBool,
    /// The one process this task may own.
    process: Mutex<Option<ProcessHandle>>,
    state: watch::Sender<TaskState>,
    completion: Mutex<Completion>,
}

impl TaskShared {
    pub(crate) fn new(id: TaskId, label: String) -> Self {
        let (state, _) = watch::channel(TaskState::Pending);
        Self {
            id,
            label,
            cancel_requested: AtomicBool::new(false),
            process: Mutex::new(None),
            state,
            completion: Mutex::new(Completion::default()),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.subscribe()
    }

    /// Move to `next` if it is further along than the current state.
    /// Returns whether the state changed.
    pub(crate) fn advance(&self, next: TaskState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if next.rank() > current.rank() {
                *current = next;
                true
            } else {
                false
            }
        });
        if changed {
            debug!(task_id = %self.id, state = %next, "task state changed");
        }
        changed
    }

    /// The checkpoint read.
    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Cancellation handler. Safe from any thread at any time.
    ///
    /// Returns `true` for the first request only.
    pub(crate) fn request_cancel(&self) -> bool {
        let first = !self.cancel_requested.swap(true, Ordering::SeqCst);
        if first {
            info!(task_id = %self.id, label = %self.label, "cancellation requested");
            self.advance(TaskState::Cancelling);
        }

        let slot = lock(&self.process);
        if let Some(handle) = slot.as_ref() {
            if handle.destroy() {
                info!(task_id = %self.id, pid = ?handle.pid(), "destroying running process");
            }
        }

        first
    }

    /// Make the spawned handle visible to the cancellation handler.
    ///
    /// A cancellation that raced past the checkpoint is honoured here.
    pub(crate) fn publish(&self, handle: ProcessHandle) {
        let mut slot = lock(&self.process);
        debug_assert!(slot.is_none(), "a task publishes at most one process handle");

        if self.cancel_requested.load(Ordering::SeqCst) && handle.destroy() {
            info!(
                task_id = %self.id,
                pid = ?handle.pid(),
                "cancellation arrived while spawning; destroying process"
            );
        }

        *slot = Some(handle);
    }

    /// Take the handle back out once the process has exited.
    pub(crate) fn retire(&self) -> Option<ProcessHandle> {
        lock(&self.process).take()
    }

    /// Base report for this task in the given terminal state.
    pub(crate) fn report(&self, state: TaskState) -> TaskReport {
        TaskReport::new(self.id, self.label.clone(), state)
    }

    pub(crate) fn is_finished(&self) -> bool {
        lock(&self.completion).report.is_some()
    }

    /// Record the final report, publish the terminal state and run the
    /// registered callbacks. Only the first call has any effect.
    pub(crate) fn finish(&self, report: TaskReport) {
        let callbacks = {
            let mut completion = lock(&self.completion);
            if completion.report.is_some() {
                return;
            }
            completion.report = Some(report.clone());
            mem::take(&mut completion.callbacks)
        };

        self.advance(report.state);
        info!(
            task_id = %self.id,
            label = %self.label,
            state = %report.state,
            exit_code = ?report.exit_code,
            "task finished"
        );

        for callback in callbacks {
            callback(&report);
        }
    }

    /// Run `callback` with the final report: later if the task is still
    /// going, right away on the calling thread if it already finished.
    pub(crate) fn on_complete(&self, callback: CompletionCallback) {
        let report = {
            let mut completion = lock(&self.completion);
            match completion.report.clone() {
                Some(report) => report,
                None => {
                    completion.callbacks.push(callback);
                    return;
                }
            }
        };
        callback(&report);
    }

    pub(crate) fn final_report(&self) -> Option<TaskReport> {
        lock(&self.completion).report.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn shared() -> TaskShared {
        TaskShared::new(TaskId(1), "go get x".to_string())
    }

    #[test]
    fn states_never_move_backwards() {
        let shared = shared();
        assert!(shared.advance(TaskState::Cancelling));
        assert!(!shared.advance(TaskState::Running));
        assert!(shared.advance(TaskState::Cancelled));
        assert!(!shared.advance(TaskState::Completed));
        assert_eq!(shared.state(), TaskState::Cancelled);
    }

    #[test]
    fn only_first_cancel_request_counts() {
        let shared = shared();
        assert!(shared.request_cancel());
        assert!(!shared.request_cancel());
        assert!(shared.is_cancel_requested());
        assert_eq!(shared.state(), TaskState::Cancelling);
    }

    #[test]
    fn publish_after_cancel_destroys_immediately() {
        let shared = shared();
        shared.request_cancel();

        let (handle, _controller) = ProcessHandle::new(Some(7));
        shared.publish(handle);

        let handle = shared.retire().expect("published handle");
        assert!(handle.is_destroy_requested());
    }

    #[test]
    fn cancel_after_publish_destroys_published_handle() {
        let shared = shared();
        let (handle, _controller) = ProcessHandle::new(Some(7));
        shared.publish(handle);

        shared.request_cancel();
        shared.request_cancel();

        let handle = shared.retire().expect("published handle");
        assert!(handle.is_destroy_requested());
        assert!(!handle.destroy(), "second destroy must be a no-op");
    }

    #[test]
    fn callbacks_run_once_whether_registered_before_or_after_finish() {
        let shared = shared();
        let calls = Arc::new(AtomicUsize::new(0));

        let before = Arc::clone(&calls);
        shared.on_complete(Box::new(move |report| {
            assert_eq!(report.state, TaskState::Completed);
            before.fetch_add(1, Ordering::SeqCst);
        }));

        shared.finish(shared.report(TaskState::Completed));
        shared.finish(shared.report(TaskState::Failed));

        let after = Arc::clone(&calls);
        shared.on_complete(Box::new(move |report| {
            assert_eq!(report.state, TaskState::Completed);
            after.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(shared.state(), TaskState::Completed);
    }
}
