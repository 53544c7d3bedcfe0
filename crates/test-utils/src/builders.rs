#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use toolrun::config::{ConfigFile, ContextConfig, DefaultsSection, RawConfigFile, ToolchainSection};
use toolrun::context::{ExecutionContext, ToolchainResolver};
use toolrun::exec::{Executor, ProcessLauncher};
use toolrun::notify::Notifier;
use toolrun::task::Services;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                toolchain: ToolchainSection::default(),
                defaults: DefaultsSection::default(),
                context: BTreeMap::new(),
            },
        }
    }

    pub fn with_toolchain_home(mut self, home: &str) -> Self {
        self.config.toolchain.home = Some(home.to_string());
        self
    }

    pub fn with_executable(mut self, exe: &str) -> Self {
        self.config.toolchain.executable = exe.to_string();
        self
    }

    pub fn with_context(mut self, name: &str, root: &str) -> Self {
        self.config.context.insert(
            name.to_string(),
            ContextConfig {
                root: root.to_string(),
                toolchain_home: None,
            },
        );
        self
    }

    pub fn with_context_toolchain(mut self, name: &str, root: &str, home: &str) -> Self {
        self.config.context.insert(
            name.to_string(),
            ContextConfig {
                root: root.to_string(),
                toolchain_home: Some(home.to_string()),
            },
        );
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolver that answers the same for every context.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    home: Option<PathBuf>,
}

impl StaticResolver {
    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }

    pub fn missing() -> Self {
        Self { home: None }
    }
}

impl ToolchainResolver for StaticResolver {
    fn resolve_toolchain(&self, _context: &ExecutionContext) -> Option<PathBuf> {
        self.home.clone()
    }
}

/// Bundle collaborators into `Services`.
pub fn services(
    resolver: impl ToolchainResolver + 'static,
    launcher: impl ProcessLauncher + 'static,
    notifier: impl Notifier + 'static,
) -> Services {
    Services::new(Arc::new(resolver), Arc::new(launcher), Arc::new(notifier))
}

/// `go get <package>` in a context rooted at `root`, with notifications and
/// output-on-error enabled.
pub fn go_get(root: impl Into<PathBuf>, package: &str) -> Executor {
    Executor::in_context(ExecutionContext::new("app", root), "go")
        .with_parameters(["get", package])
        .show_notifications()
        .show_output_on_error()
}
