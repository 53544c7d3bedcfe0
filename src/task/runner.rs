// src/task/runner.rs

//! Submitting tasks and talking to them afterwards.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{oneshot, watch};
use tracing::info;

use crate::context::ToolchainResolver;
use crate::exec::{LaunchConfig, ProcessLauncher};
use crate::notify::Notifier;
use crate::types::Presentation;

use super::background::{CompletionGuard, run_task_body};
use super::scheduler::Scheduler;
use super::shared::TaskShared;
use super::{TaskId, TaskReport, TaskState};

/// External collaborators a task body needs.
#[derive(Debug, Clone)]
pub struct Services {
    pub resolver: Arc<dyn ToolchainResolver>,
    pub launcher: Arc<dyn ProcessLauncher>,
    pub notifier: Arc<dyn Notifier>,
}

impl Services {
    pub fn new(
        resolver: Arc<dyn ToolchainResolver>,
        launcher: Arc<dyn ProcessLauncher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            resolver,
            launcher,
            notifier,
        }
    }
}

/// Submits launch configurations as background tasks.
pub struct TaskRunner<S: Scheduler> {
    scheduler: S,
    services: Services,
    next_id: AtomicU64,
}

impl<S: Scheduler> fmt::Debug for TaskRunner<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

impl<S: Scheduler> TaskRunner<S> {
    pub fn new(scheduler: S, services: Services) -> Self {
        Self {
            scheduler,
            services,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Hand `config` to the scheduler and return a handle to the new task.
    ///
    /// Never blocks and never runs the task on the calling thread.
    /// `run_in_background` only selects how the task is presented.
    pub fn submit(&self, config: LaunchConfig, run_in_background: bool) -> TaskHandle {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let presentation = Presentation::from_background_flag(run_in_background);
        let shared = Arc::new(TaskShared::new(id, config.presentable_name()));

        info!(
            task_id = %id,
            label = %shared.label(),
            context = %config.context().name(),
            ?presentation,
            "task submitted"
        );

        let guard = CompletionGuard::new(Arc::clone(&shared));
        let body = run_task_body(guard, config, self.services.clone());
        self.scheduler.schedule(Box::pin(body));

        TaskHandle {
            shared,
            presentation,
        }
    }
}

/// Caller's view of a submitted task. Cheap to clone; all clones refer to
/// the same task.
#[derive(Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
    presentation: Presentation,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.shared.id())
            .field("label", &self.shared.label())
            .field("state", &self.shared.state())
            .field("presentation", &self.presentation)
            .finish()
    }
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.shared.id()
    }

    pub fn label(&self) -> &str {
        self.shared.label()
    }

    pub fn presentation(&self) -> Presentation {
        self.presentation
    }

    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Stream of state transitions.
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.shared.subscribe()
    }

    /// Ask the task to stop. Safe to call from any thread, any number of
    /// times, before, during or after the process runs.
    ///
    /// Returns `true` for the first request. Does not wait for the process
    /// to go away; use [`TaskHandle::wait`] for that.
    pub fn request_cancel(&self) -> bool {
        self.shared.request_cancel()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.shared.is_cancel_requested()
    }

    /// Register a callback for the final report. Runs immediately on the
    /// calling thread if the task has already finished.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&TaskReport) + Send + 'static,
    {
        self.shared.on_complete(Box::new(callback));
    }

    /// Final report, if the task has finished.
    pub fn report(&self) -> Option<TaskReport> {
        self.shared.final_report()
    }

    /// Wait for the final report.
    pub async fn wait(&self) -> TaskReport {
        let (tx, rx) = oneshot::channel();
        self.on_complete(move |report| {
            let _ = tx.send(report.clone());
        });

        match rx.await {
            Ok(report) => report,
            // The callback list lives as long as `self.shared`, so the sender
            // can only vanish if a callback panicked mid-delivery.
            Err(_) => self
                .report()
                .unwrap_or_else(|| self.shared.report(TaskState::Cancelled)),
        }
    }
}
