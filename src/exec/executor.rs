// src/exec/executor.rs

//! Launch configuration and the executor that turns it into a process.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{ExecutionContext, ToolchainResolver, executable_path, usable_toolchain};
use crate::task::TaskError;

use super::launcher::{CommandSpec, ProcessLauncher};
use super::process::ProcessHandle;

/// Immutable description of one command launch.
///
/// Built with [`Executor`]; read-only once built.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    context: ExecutionContext,
    executable: String,
    parameters: Vec<String>,
    presentable_name: Option<String>,
    failure_title: Option<String>,
    show_notifications: bool,
    show_output_on_error: bool,
    success_exit_codes: Vec<i32>,
}

impl LaunchConfig {
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Label shown to the user. Falls back to the command line itself.
    pub fn presentable_name(&self) -> String {
        match &self.presentable_name {
            Some(name) => name.clone(),
            None if self.parameters.is_empty() => self.executable.clone(),
            None => format!("{} {}", self.executable, self.parameters.join(" ")),
        }
    }

    /// Headline of failure notifications.
    pub fn failure_title(&self) -> String {
        self.failure_title
            .clone()
            .unwrap_or_else(|| format!("`{}` failed", self.presentable_name()))
    }

    pub fn shows_notifications(&self) -> bool {
        self.show_notifications
    }

    pub fn shows_output_on_error(&self) -> bool {
        self.show_output_on_error
    }

    pub fn success_exit_codes(&self) -> &[i32] {
        &self.success_exit_codes
    }

    pub fn is_success(&self, code: i32) -> bool {
        self.success_exit_codes.contains(&code)
    }
}

/// Builder for a [`LaunchConfig`] that can also run it.
///
/// Configuration methods have no side effects; nothing is resolved or
/// spawned until [`Executor::execute`]. One executor may be executed more
/// than once, but each call starts an independent process.
#[derive(Debug, Clone)]
pub struct Executor {
    config: LaunchConfig,
}

impl Executor {
    /// Start configuring a launch of `executable` (a binary under
    /// `<toolchain home>/bin`) in `context`.
    pub fn in_context(context: ExecutionContext, executable: impl Into<String>) -> Self {
        Self {
            config: LaunchConfig {
                context,
                executable: executable.into(),
                parameters: Vec::new(),
                presentable_name: None,
                failure_title: None,
                show_notifications: false,
                show_output_on_error: false,
                success_exit_codes: vec![0],
            },
        }
    }

    pub fn from_config(config: LaunchConfig) -> Self {
        Self { config }
    }

    /// Append command arguments, in order.
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .parameters
            .extend(parameters.into_iter().map(Into::into));
        self
    }

    pub fn with_presentable_name(mut self, name: impl Into<String>) -> Self {
        self.config.presentable_name = Some(name.into());
        self
    }

    pub fn with_failure_title(mut self, title: impl Into<String>) -> Self {
        self.config.failure_title = Some(title.into());
        self
    }

    /// Notify the user when the command finishes, successfully or not.
    pub fn show_notifications(mut self) -> Self {
        self.config.show_notifications = true;
        self
    }

    /// Capture output and include it when the command fails.
    pub fn show_output_on_error(mut self) -> Self {
        self.config.show_output_on_error = true;
        self
    }

    /// Replace the exit codes counted as success (default `[0]`).
    pub fn with_success_exit_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.config.success_exit_codes = codes.into_iter().collect();
        self
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    pub fn into_config(self) -> LaunchConfig {
        self.config
    }

    /// Resolve the full command line against a toolchain home.
    pub fn command_spec(&self, toolchain_home: &Path) -> CommandSpec {
        CommandSpec {
            label: self.config.presentable_name(),
            program: executable_path(toolchain_home, &self.config.executable),
            args: self.config.parameters.clone(),
            working_dir: self.config.context.root().to_path_buf(),
            capture_output: self.config.show_output_on_error,
        }
    }

    /// Validate that a toolchain is configured, then spawn the process.
    ///
    /// A missing toolchain is reported as [`TaskError::Configuration`]
    /// without touching the launcher; OS failures are [`TaskError::Spawn`].
    pub fn execute(
        &self,
        resolver: &dyn ToolchainResolver,
        launcher: &dyn ProcessLauncher,
    ) -> Result<ProcessHandle, TaskError> {
        let context = &self.config.context;

        let Some(home) = usable_toolchain(resolver, context) else {
            debug!(context = %context.name(), "no toolchain configured");
            return Err(TaskError::Configuration {
                context: context.name().to_string(),
                executable: self.config.executable.clone(),
            });
        };

        let spec = self.command_spec(&home);
        info!(
            label = %spec.label,
            program = %spec.program.display(),
            args = ?spec.args,
            dir = %spec.working_dir.display(),
            "launching command"
        );

        launcher.launch(&spec).map_err(|source| TaskError::Spawn {
            program: spec.program.clone(),
            source: Arc::new(source),
        })
    }
}
