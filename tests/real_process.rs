// tests/real_process.rs
//! End-to-end runs against `/bin/sh`, using `/` as the toolchain home.
#![cfg(unix)]

mod common;
use crate::common::builders::{StaticResolver, services};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;

use tempfile::TempDir;
use toolrun::context::ExecutionContext;
use toolrun::exec::{Executor, OsProcessLauncher};
use toolrun::task::{TaskError, TaskRunner, TaskState, TokioScheduler};
use toolrun_test_utils::RecordingNotifier;

type TestResult = Result<(), Box<dyn Error>>;

fn shell(dir: &TempDir, script: &str) -> Executor {
    Executor::in_context(ExecutionContext::new("tmp", dir.path()), "sh")
        .with_parameters(["-c", script])
        .with_presentable_name("sh script")
}

fn os_runner(notifier: RecordingNotifier) -> Result<TaskRunner<TokioScheduler>, Box<dyn Error>> {
    Ok(TaskRunner::new(
        TokioScheduler::current()?,
        services(StaticResolver::at("/"), OsProcessLauncher, notifier),
    ))
}

#[tokio::test]
async fn successful_command_completes() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let runner = os_runner(RecordingNotifier::new())?;

    let handle = runner.submit(shell(&dir, "exit 0").into_config(), true);
    let report = with_timeout(handle.wait()).await;

    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(report.exit_code, Some(0));
    assert!(report.spawned);
    Ok(())
}

#[tokio::test]
async fn runs_in_the_context_root() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let runner = os_runner(RecordingNotifier::new())?;

    let handle = runner.submit(shell(&dir, "echo here > marker.txt").into_config(), true);
    let report = with_timeout(handle.wait()).await;

    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(fs::read_to_string(dir.path().join("marker.txt"))?.trim(), "here");
    Ok(())
}

#[tokio::test]
async fn failing_command_reports_stderr() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let notifier = RecordingNotifier::new();
    let runner = os_runner(notifier.clone())?;

    let config = shell(&dir, "echo boom >&2; exit 3")
        .show_output_on_error()
        .into_config();
    let handle = runner.submit(config, true);
    let report = with_timeout(handle.wait()).await;

    assert_eq!(report.state, TaskState::Failed);
    assert_eq!(report.exit_code, Some(3));
    match &report.error {
        Some(TaskError::RuntimeFailure { code: 3, output: Some(output), .. }) => {
            assert_eq!(output.stderr, vec!["boom".to_string()]);
        }
        other => panic!("expected runtime failure with output, got {other:?}"),
    }

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].0.contains("boom"));
    Ok(())
}

#[tokio::test]
async fn cancelling_a_running_command_kills_it() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let runner = os_runner(RecordingNotifier::new())?;

    let handle = runner.submit(shell(&dir, "exec sleep 30").into_config(), true);
    let mut states = handle.subscribe();
    with_timeout(states.wait_for(|s| *s == TaskState::Running)).await?;
    // Give the worker a moment to publish the handle; cancel works either way.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(handle.request_cancel());
    let report = with_timeout(handle.wait()).await;

    assert_eq!(report.state, TaskState::Cancelled);
    assert!(report.error.is_none());
    Ok(())
}

#[tokio::test]
async fn cancel_after_natural_exit_does_not_hide_the_failure() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let notifier = RecordingNotifier::new();
    let runner = os_runner(notifier.clone())?;

    // The background sleep keeps the pipes open, so output draining outlasts
    // the shell itself.
    let config = shell(&dir, "echo broke >&2; sleep 3 & exit 1")
        .show_output_on_error()
        .into_config();
    let handle = runner.submit(config, true);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    handle.request_cancel();
    let report = with_timeout(handle.wait()).await;

    assert_eq!(report.state, TaskState::Failed);
    assert_eq!(report.exit_code, Some(1));
    match &report.error {
        Some(TaskError::RuntimeFailure { code: 1, output: Some(output), .. }) => {
            assert_eq!(output.stderr, vec!["broke".to_string()]);
        }
        other => panic!("expected runtime failure with output, got {other:?}"),
    }
    assert_eq!(notifier.messages().len(), 1);
    Ok(())
}

#[tokio::test]
async fn missing_binary_is_a_spawn_error() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let notifier = RecordingNotifier::new();
    let runner = os_runner(notifier.clone())?;

    let config = Executor::in_context(ExecutionContext::new("tmp", dir.path()), "toolrun-no-such-tool")
        .into_config();
    let handle = runner.submit(config, true);
    let report = with_timeout(handle.wait()).await;

    assert_eq!(report.state, TaskState::Failed);
    assert!(!report.spawned);
    assert!(matches!(report.error, Some(TaskError::Spawn { .. })));
    assert_eq!(notifier.messages().len(), 1);
    Ok(())
}
