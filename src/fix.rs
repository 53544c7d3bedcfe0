// src/fix.rs

//! "Fetch this package" fix: run `<exe> get <package>` in the context that
//! owns a source location.

use tracing::debug;

use crate::context::{ContextLocator, ExecutionContext, SourceLocation, usable_toolchain};
use crate::exec::{Executor, LaunchConfig};
use crate::task::{Scheduler, TaskHandle, TaskRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPackageFix {
    package: String,
    executable: String,
}

impl FetchPackageFix {
    pub fn new(package: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            executable: executable.into(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Name offered to the user, e.g. `go get 'golang.org/x/net'`.
    pub fn name(&self) -> String {
        format!("{} get '{}'", self.executable, self.package)
    }

    pub fn launch_config(&self, context: ExecutionContext) -> LaunchConfig {
        Executor::in_context(context, self.executable.clone())
            .with_presentable_name(format!("{} get {}", self.executable, self.package))
            .with_parameters(["get", self.package.as_str()])
            .with_failure_title(format!("Something went wrong with `{} get`", self.executable))
            .show_notifications()
            .show_output_on_error()
            .into_config()
    }

    /// Apply the fix for a source location.
    ///
    /// Returns `None`, silently, when no context owns `location` or the
    /// context has no toolchain; the fix simply does not apply there.
    pub fn apply<S: Scheduler>(
        &self,
        runner: &TaskRunner<S>,
        locator: &dyn ContextLocator,
        location: &SourceLocation,
        start_in_background: bool,
    ) -> Option<TaskHandle> {
        let Some(context) = locator.find_context(location) else {
            debug!(path = %location.path.display(), "no context for location; fix not applicable");
            return None;
        };
        self.apply_in_context(runner, context, start_in_background)
    }

    pub fn apply_in_context<S: Scheduler>(
        &self,
        runner: &TaskRunner<S>,
        context: ExecutionContext,
        start_in_background: bool,
    ) -> Option<TaskHandle> {
        if usable_toolchain(runner.services().resolver.as_ref(), &context).is_none() {
            debug!(context = %context.name(), "no toolchain for context; fix not applicable");
            return None;
        }
        Some(runner.submit(self.launch_config(context), start_in_background))
    }
}
