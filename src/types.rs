use std::fmt;

use serde::Deserialize;

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// How a submitted task is presented to the user while it runs.
///
/// - `Background`: the task is sent to the background right away and only
///   its completion is reported (default).
/// - `Foreground`: the caller intends to follow the task's progress until it
///   finishes; the CLI prints every state transition.
///
/// Scheduling is identical for both: the task body never runs on the
/// submitting thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    #[default]
    Background,
    Foreground,
}

impl Presentation {
    pub fn from_background_flag(run_in_background: bool) -> Self {
        if run_in_background {
            Presentation::Background
        } else {
            Presentation::Foreground
        }
    }
}
