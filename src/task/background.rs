// src/task/background.rs

//! The task body: checkpoint, spawn, publish, wait, classify.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::exec::{Executor, LaunchConfig, ProcessExit};
use crate::notify::deliver;
use crate::types::Severity;

use super::runner::Services;
use super::shared::TaskShared;
use super::{TaskError, TaskReport, TaskState};

/// Finishes the task if the body is dropped before it reports, e.g. because
/// the runtime shut down. Also tears down a process that is still published.
pub(crate) struct CompletionGuard {
    shared: Arc<TaskShared>,
}

impl CompletionGuard {
    pub(crate) fn new(shared: Arc<TaskShared>) -> Self {
        Self { shared }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.shared.is_finished() {
            return;
        }

        warn!(task_id = %self.shared.id(), "task body dropped before finishing");
        let mut report = self.shared.report(TaskState::Cancelled);
        if let Some(handle) = self.shared.retire() {
            handle.destroy();
            report.spawned = true;
        }
        self.shared.finish(report);
    }
}

/// Run one task to completion. All failures end up in the report; nothing
/// escapes to the scheduler.
pub(crate) async fn run_task_body(guard: CompletionGuard, config: LaunchConfig, services: Services) {
    let shared = Arc::clone(&guard.shared);
    shared.advance(TaskState::Running);

    let report = run_guarded(&shared, &config, &services).await;
    announce(&report, &config, &services);
    shared.finish(report);

    drop(guard);
}

async fn run_guarded(shared: &TaskShared, config: &LaunchConfig, services: &Services) -> TaskReport {
    // Checkpoint: after this read the task commits to spawning.
    if shared.is_cancel_requested() {
        info!(task_id = %shared.id(), "cancelled before start; not spawning");
        return shared.report(TaskState::Cancelled);
    }
    if config.context().is_disposed() {
        info!(
            task_id = %shared.id(),
            context = %config.context().name(),
            "context disposed before start; not spawning"
        );
        return shared.report(TaskState::Cancelled);
    }

    let executor = Executor::from_config(config.clone());
    let handle = match executor.execute(services.resolver.as_ref(), services.launcher.as_ref()) {
        Ok(handle) => handle,
        Err(err) => {
            warn!(task_id = %shared.id(), error = %err, "task could not start");
            let mut report = shared.report(TaskState::Failed);
            report.error = Some(err);
            return report;
        }
    };

    let exit = handle.on_exit();
    shared.publish(handle);

    let exit = exit.wait().await;
    let destroyed = shared
        .retire()
        .is_some_and(|handle| handle.is_destroy_requested());

    classify(shared, config, exit, destroyed)
}

/// Map a process exit to a terminal report. A delivered destroy request
/// takes priority over whatever exit code the process managed to produce.
fn classify(
    shared: &TaskShared,
    config: &LaunchConfig,
    exit: ProcessExit,
    destroyed: bool,
) -> TaskReport {
    let code = exit.code();

    let mut report = match exit {
        ProcessExit::Destroyed { .. } => shared.report(TaskState::Cancelled),
        ProcessExit::Exited { .. } if destroyed => shared.report(TaskState::Cancelled),
        ProcessExit::Exited { code, .. } if config.is_success(code) => {
            shared.report(TaskState::Completed)
        }
        ProcessExit::Exited { code, output } => {
            let mut report = shared.report(TaskState::Failed);
            report.error = Some(TaskError::RuntimeFailure {
                label: shared.label().to_string(),
                code,
                output: config.shows_output_on_error().then_some(output),
            });
            report
        }
    };

    report.exit_code = code;
    report.spawned = true;
    report
}

/// Tell the user how the task ended. Cancellation stays silent.
fn announce(report: &TaskReport, config: &LaunchConfig, services: &Services) {
    let notifier = services.notifier.as_ref();

    match (&report.state, &report.error) {
        (TaskState::Cancelled, _) => {
            debug!(task_id = %report.id, "cancelled; no notification");
        }
        (TaskState::Completed, _) => {
            if config.shows_notifications() {
                let message = format!("`{}` finished successfully", report.label);
                deliver(notifier, &message, Severity::Info);
            }
        }
        (_, Some(err)) => {
            let output = match err {
                TaskError::RuntimeFailure { output, .. } => {
                    if !config.shows_notifications() && !config.shows_output_on_error() {
                        return;
                    }
                    output.as_ref()
                }
                // Configuration and spawn problems are always reported.
                TaskError::Configuration { .. } | TaskError::Spawn { .. } => None,
            };

            let mut message = format!("{}\n{err}", config.failure_title());
            if let Some(output) = output.filter(|o| !o.is_empty()) {
                message.push('\n');
                message.push_str(&output.render());
            }
            deliver(notifier, &message, Severity::Error);
        }
        (state, None) => {
            debug!(task_id = %report.id, %state, "nothing to announce");
        }
    }
}
