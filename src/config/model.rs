// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::Presentation;

/// Top-level configuration as read from a TOML file:
///
/// ```toml
/// [toolchain]
/// home = "/usr/local/go"
/// home_env = "GOROOT"
/// executable = "go"
///
/// [defaults]
/// success_exit_codes = [0]
/// show_notifications = true
/// show_output_on_error = true
///
/// [context.api]
/// root = "services/api"
/// toolchain_home = "/opt/go1.22"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Where the toolchain lives, from `[toolchain]`.
    #[serde(default)]
    pub toolchain: ToolchainSection,

    /// Launch defaults from `[defaults]`.
    #[serde(default)]
    pub defaults: DefaultsSection,

    /// Execution contexts from `[context.<name>]`.
    #[serde(default)]
    pub context: BTreeMap<String, ContextConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub toolchain: ToolchainSection,
    pub defaults: DefaultsSection,
    pub context: BTreeMap<String, ContextConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        toolchain: ToolchainSection,
        defaults: DefaultsSection,
        context: BTreeMap<String, ContextConfig>,
    ) -> Self {
        Self {
            toolchain,
            defaults,
            context,
        }
    }
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainSection {
    /// Toolchain home used by every context without an override.
    /// An empty string counts as "not configured".
    #[serde(default)]
    pub home: Option<String>,

    /// Environment variable consulted when no home is configured.
    #[serde(default)]
    pub home_env: Option<String>,

    /// Binary looked up under `<home>/bin`.
    #[serde(default = "default_executable")]
    pub executable: String,
}

fn default_executable() -> String {
    "go".to_string()
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            home: None,
            home_env: None,
            executable: default_executable(),
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultsSection {
    /// Exit codes counted as success.
    #[serde(default = "default_success_exit_codes")]
    pub success_exit_codes: Vec<i32>,

    #[serde(default = "default_true")]
    pub show_notifications: bool,

    #[serde(default = "default_true")]
    pub show_output_on_error: bool,

    /// `"background"` (default) or `"foreground"`.
    #[serde(default)]
    pub presentation: Presentation,
}

fn default_success_exit_codes() -> Vec<i32> {
    vec![0]
}

fn default_true() -> bool {
    true
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            success_exit_codes: default_success_exit_codes(),
            show_notifications: true,
            show_output_on_error: true,
            presentation: Presentation::default(),
        }
    }
}

/// `[context.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Directory of the context, relative to the config file's directory
    /// unless absolute. Commands run here.
    pub root: String,

    /// Per-context toolchain home, overriding `[toolchain].home`.
    #[serde(default)]
    pub toolchain_home: Option<String>,
}
