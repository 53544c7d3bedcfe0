// src/task/scheduler.rs

//! Where task bodies run.
//!
//! The runner hands every submitted task to a `Scheduler` as a boxed future.
//! Production code uses [`TokioScheduler`], which spawns onto a Tokio
//! runtime's worker pool; tests can provide a scheduler that holds jobs back
//! until told to run them.

use std::future::Future;
use std::pin::Pin;

use anyhow::anyhow;
use tokio::runtime::Handle;

use crate::errors::{Result, ToolrunError};

/// A task body ready to be driven to completion.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Trait abstracting how task bodies are executed.
pub trait Scheduler: Send + Sync {
    /// Arrange for `job` to run later, never on the calling thread and
    /// without blocking it.
    fn schedule(&self, job: Job);
}

/// Scheduler backed by a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running in.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| ToolrunError::Other(anyhow!("no Tokio runtime available: {e}")))?;
        Ok(Self::new(handle))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, job: Job) {
        // Detached: results flow through the task's completion callbacks.
        drop(self.handle.spawn(job));
    }
}
