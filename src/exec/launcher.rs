// src/exec/launcher.rs

//! Spawning OS processes behind a pluggable trait.
//!
//! The executor talks to a `ProcessLauncher` instead of `tokio::process`
//! directly, so tests can swap in a launcher that records spawns and lets
//! them decide when a "process" exits.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::process::{CapturedOutput, MAX_CAPTURED_LINES, ProcessController, ProcessExit, ProcessHandle};

/// How long to keep draining output after the process itself is gone.
///
/// Grandchildren can inherit the pipes and keep them open indefinitely.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Human-readable name used in logs.
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Keep the tail of stdout/stderr for error reporting.
    pub capture_output: bool,
}

/// Trait abstracting how processes are started.
///
/// Production code uses [`OsProcessLauncher`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessLauncher: Send + Sync + Debug {
    /// Start the process described by `spec`.
    ///
    /// Errors are returned synchronously and leave nothing running.
    fn launch(&self, spec: &CommandSpec) -> io::Result<ProcessHandle>;
}

/// Launcher backed by `tokio::process`.
///
/// Must be used from within a Tokio runtime: each launched process gets a
/// supervising Tokio task that owns the `Child`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessLauncher;

impl ProcessLauncher for OsProcessLauncher {
    fn launch(&self, spec: &CommandSpec) -> io::Result<ProcessHandle> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let pid = child.id();

        info!(
            label = %spec.label,
            program = %spec.program.display(),
            pid = ?pid,
            "process started"
        );

        let stdout = child
            .stdout
            .take()
            .map(|s| drain_lines(s, spec.label.clone(), "stdout", spec.capture_output));
        let stderr = child
            .stderr
            .take()
            .map(|s| drain_lines(s, spec.label.clone(), "stderr", spec.capture_output));

        let (handle, controller) = ProcessHandle::new(pid);
        tokio::spawn(supervise(child, controller, stdout, stderr, spec.label.clone()));

        Ok(handle)
    }
}

/// Own the child until it exits or a destroy request arrives, then report
/// the exit through the controller.
async fn supervise(
    mut child: Child,
    mut controller: ProcessController,
    stdout: Option<OutputTail>,
    stderr: Option<OutputTail>,
    label: String,
) {
    let status = tokio::select! {
        status = child.wait() => {
            // Exited on its own: a destroy arriving while output drains must
            // not be mistaken for the cause of termination.
            controller.seal();
            Some(status)
        }
        explicit = controller.destroyed() => {
            if explicit {
                info!(label = %label, "destroy requested; killing process");
            } else {
                debug!(label = %label, "process handle dropped; killing process");
            }
            if let Err(e) = child.kill().await {
                warn!(label = %label, error = %e, "failed to kill process");
            }
            None
        }
    };

    let output = CapturedOutput {
        stdout: collect_lines(stdout).await,
        stderr: collect_lines(stderr).await,
    };

    let exit = match status {
        Some(Ok(status)) => {
            let code = status.code().unwrap_or(-1);
            info!(label = %label, exit_code = code, success = status.success(), "process exited");
            ProcessExit::Exited { code, output }
        }
        Some(Err(e)) => {
            warn!(label = %label, error = %e, "waiting for process failed");
            ProcessExit::Exited { code: -1, output }
        }
        None => ProcessExit::Destroyed { output },
    };

    controller.finish(exit);
}

/// A stream being drained in the background, plus the lines kept so far.
struct OutputTail {
    kept: Arc<Mutex<VecDeque<String>>>,
    reader: JoinHandle<()>,
}

/// Consume a stream line by line, logging at debug and keeping the last
/// [`MAX_CAPTURED_LINES`] lines when `capture` is set.
fn drain_lines<R>(reader: R, label: String, stream: &'static str, capture: bool) -> OutputTail
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let kept = Arc::new(Mutex::new(VecDeque::new()));
    let sink = Arc::clone(&kept);

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(label = %label, stream, "{}", line);
            if capture {
                let mut kept = sink.lock().unwrap_or_else(PoisonError::into_inner);
                if kept.len() == MAX_CAPTURED_LINES {
                    kept.pop_front();
                }
                kept.push_back(line);
            }
        }
    });

    OutputTail { kept, reader }
}

/// Wait a bounded time for a stream to close, then take whatever was kept.
/// Lines read before the grace period ran out are not lost.
async fn collect_lines(tail: Option<OutputTail>) -> Vec<String> {
    let Some(OutputTail { kept, mut reader }) = tail else {
        return Vec::new();
    };

    match tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut reader).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "output reader task failed"),
        Err(_) => {
            debug!("output still open after process exit; keeping what was read");
            reader.abort();
        }
    }

    let mut kept = kept.lock().unwrap_or_else(PoisonError::into_inner);
    Vec::from(std::mem::take(&mut *kept))
}
