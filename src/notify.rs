// src/notify.rs

//! User-visible notifications.
//!
//! Delivery is best effort: a failing notifier is logged and otherwise
//! ignored, it never changes the outcome of a task.

use std::fmt::Debug;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::types::Severity;

/// Sink for messages meant for the user.
pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, message: &str, severity: Severity) -> Result<()>;
}

/// Notifier that writes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) -> Result<()> {
        match severity {
            Severity::Info => info!(target: "toolrun::notify", "{message}"),
            Severity::Warning => warn!(target: "toolrun::notify", "{message}"),
            Severity::Error => error!(target: "toolrun::notify", "{message}"),
        }
        Ok(())
    }
}

/// Send a notification, swallowing delivery failures.
pub fn deliver(notifier: &dyn Notifier, message: &str, severity: Severity) {
    if let Err(e) = notifier.notify(message, severity) {
        warn!(%severity, error = %e, "failed to deliver notification");
    }
}
