// src/exec/process.rs

//! Owning handle around one spawned external process.
//!
//! A process is represented by two halves created together by
//! [`ProcessHandle::new`]:
//!
//! - [`ProcessHandle`] is what the owner (a background task) keeps. It can
//!   request termination with [`ProcessHandle::destroy`] and observe the exit
//!   through [`ProcessHandle::on_exit`].
//! - [`ProcessController`] is the supervising side. Whoever actually owns the
//!   OS resource (see [`crate::exec::launcher`]) waits for destroy requests on
//!   it and reports the exit exactly once with [`ProcessController::finish`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

/// Lines kept per stream when output capture is enabled.
pub const MAX_CAPTURED_LINES: usize = 200;

/// Output retained from a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CapturedOutput {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    /// Render the captured lines for a notification: stderr first, since
    /// that is where tools put their diagnostics.
    pub fn render(&self) -> String {
        self.stderr
            .iter()
            .chain(self.stdout.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// How a process terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// The process exited on its own. `code` is `-1` when the OS reports no
    /// exit code (e.g. terminated by a signal nobody asked for).
    Exited { code: i32, output: CapturedOutput },
    /// The process was terminated because [`ProcessHandle::destroy`] was
    /// called (or its handle was dropped).
    Destroyed { output: CapturedOutput },
}

impl ProcessExit {
    pub fn code(&self) -> Option<i32> {
        match self {
            ProcessExit::Exited { code, .. } => Some(*code),
            ProcessExit::Destroyed { .. } => None,
        }
    }

    pub fn output(&self) -> &CapturedOutput {
        match self {
            ProcessExit::Exited { output, .. } | ProcessExit::Destroyed { output } => output,
        }
    }
}

/// Owning handle for one running process.
///
/// Dropping the handle before the process exits counts as a destroy request.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    destroy_tx: Mutex<Option<oneshot::Sender<()>>>,
    destroy_delivered: AtomicBool,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
}

/// Supervising side of a [`ProcessHandle`].
#[derive(Debug)]
pub struct ProcessController {
    destroy_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<ProcessExit>>,
}

/// Future-producing view of a process's exit, detached from the handle so the
/// handle itself can be shared with a cancellation path while someone waits.
#[derive(Debug, Clone)]
pub struct ExitSignal {
    rx: watch::Receiver<Option<ProcessExit>>,
}

impl ProcessHandle {
    /// Create a connected handle/controller pair for a process with the given
    /// OS id (if known).
    pub fn new(pid: Option<u32>) -> (ProcessHandle, ProcessController) {
        let (destroy_tx, destroy_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        let handle = ProcessHandle {
            pid,
            destroy_tx: Mutex::new(Some(destroy_tx)),
            destroy_delivered: AtomicBool::new(false),
            exit_rx,
        };
        let controller = ProcessController {
            destroy_rx,
            exit_tx,
        };

        (handle, controller)
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Request termination without waiting for it.
    ///
    /// Returns `true` only for the call that actually delivered the request.
    /// Repeated calls, and calls after the process has already exited, are
    /// no-ops returning `false`.
    pub fn destroy(&self) -> bool {
        if self.has_exited() {
            debug!(pid = ?self.pid, "destroy after exit ignored");
            return false;
        }

        let Some(tx) = lock(&self.destroy_tx).take() else {
            return false;
        };

        match tx.send(()) {
            Ok(()) => {
                self.destroy_delivered.store(true, Ordering::SeqCst);
                debug!(pid = ?self.pid, "destroy request delivered");
                true
            }
            Err(()) => {
                debug!(pid = ?self.pid, "process supervisor already gone; destroy ignored");
                false
            }
        }
    }

    /// Whether a destroy request reached the supervisor before it finished.
    pub fn is_destroy_requested(&self) -> bool {
        self.destroy_delivered.load(Ordering::SeqCst)
    }

    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    pub fn on_exit(&self) -> ExitSignal {
        ExitSignal {
            rx: self.exit_rx.clone(),
        }
    }
}

impl ExitSignal {
    /// Wait until the process terminates.
    pub async fn wait(mut self) -> ProcessExit {
        match self.rx.wait_for(Option::is_some).await {
            Ok(exit) => (*exit).clone().unwrap_or_else(lost_exit),
            Err(_) => lost_exit(),
        }
    }
}

impl ProcessController {
    /// Resolve once the owner asks for termination.
    ///
    /// Returns `true` for an explicit [`ProcessHandle::destroy`] and `false`
    /// when the handle was dropped instead. Both mean the process must go.
    pub async fn destroyed(&mut self) -> bool {
        (&mut self.destroy_rx).await.is_ok()
    }

    /// Stop accepting destroy requests because the process already exited on
    /// its own. A later [`ProcessHandle::destroy`] returns `false` and is not
    /// counted as delivered.
    pub fn seal(&mut self) {
        self.destroy_rx.close();
    }

    /// Report the exit. Consumes the controller so it can only fire once.
    pub fn finish(self, exit: ProcessExit) {
        self.exit_tx.send_replace(Some(exit));
    }
}

/// Exit reported when a supervisor vanished without reporting anything.
fn lost_exit() -> ProcessExit {
    warn!("process supervisor stopped without reporting an exit");
    ProcessExit::Exited {
        code: -1,
        output: CapturedOutput::default(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
