use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use toolrun::task::{Job, Scheduler};

/// A scheduler that holds jobs until the test releases them, so a test can
/// act on a task while it is still `Pending`.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Spawn the oldest held job onto the current Tokio runtime.
    pub fn run_next(&self) -> Option<JoinHandle<()>> {
        let job = self.jobs.lock().unwrap().pop_front()?;
        Some(tokio::spawn(job))
    }

    /// Drop every held job without running it.
    pub fn discard_all(&self) {
        let jobs = std::mem::take(&mut *self.jobs.lock().unwrap());
        drop(jobs);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, job: Job) {
        self.jobs.lock().unwrap().push_back(job);
    }
}
