use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use toolrun::notify::Notifier;
use toolrun::types::Severity;

/// A notifier that records every message, optionally failing each delivery
/// after recording it.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, Severity)>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `notify` call returns an error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
        if self.fail {
            bail!("notification backend unavailable");
        }
        Ok(())
    }
}
