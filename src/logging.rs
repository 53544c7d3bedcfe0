// src/logging.rs

//! Logging setup for `toolrun`.
//!
//! The filter comes from, in order:
//! 1. the `--log-level` flag,
//! 2. the `TOOLRUN_LOG` environment variable, which accepts full
//!    `EnvFilter` directives such as `toolrun::task=debug,info`,
//! 3. `info`.
//!
//! Logs go to stderr, next to the foreground progress lines printed by
//! `lib::supervise`; stdout is reserved for dry-run listings.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "TOOLRUN_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(directive(level)),
        None => filter_from_env(std::env::var(LOG_ENV).ok().as_deref()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Parse `TOOLRUN_LOG`, falling back to `info` when unset or invalid.
fn filter_from_env(value: Option<&str>) -> EnvFilter {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_directives_are_honoured() {
        let filter = filter_from_env(Some(" toolrun::task=debug,warn "));
        let rendered = filter.to_string();
        assert!(rendered.contains("toolrun::task=debug"), "got {rendered}");
        assert!(rendered.contains("warn"), "got {rendered}");
    }

    #[test]
    fn missing_or_blank_env_means_info() {
        assert_eq!(filter_from_env(None).to_string(), "info");
        assert_eq!(filter_from_env(Some("   ")).to_string(), "info");
    }
}
