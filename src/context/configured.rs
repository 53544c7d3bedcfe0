// src/context/configured.rs

//! Context lookup and toolchain resolution driven by the config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::config::ConfigFile;

use super::{ContextLocator, ExecutionContext, SourceLocation, ToolchainResolver};

/// Name of the context used when the config declares none.
pub const IMPLICIT_CONTEXT: &str = "default";

/// Contexts declared as `[context.<name>]`, with roots made absolute.
///
/// A location belongs to the context with the longest root that contains
/// it. Without any declared context, a single implicit context rooted at the
/// config directory is used.
#[derive(Debug, Clone)]
pub struct ConfiguredContexts {
    contexts: Vec<ExecutionContext>,
}

impl ConfiguredContexts {
    pub fn from_config(cfg: &ConfigFile, base_dir: &Path) -> Self {
        let contexts = if cfg.context.is_empty() {
            vec![ExecutionContext::new(IMPLICIT_CONTEXT, base_dir)]
        } else {
            cfg.context
                .iter()
                .map(|(name, c)| ExecutionContext::new(name.clone(), absolutize(base_dir, &c.root)))
                .collect()
        };

        Self { contexts }
    }

    pub fn by_name(&self, name: &str) -> Option<ExecutionContext> {
        self.contexts.iter().find(|c| c.name() == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionContext> {
        self.contexts.iter()
    }
}

impl ContextLocator for ConfiguredContexts {
    fn find_context(&self, location: &SourceLocation) -> Option<ExecutionContext> {
        let found = self
            .contexts
            .iter()
            .filter(|c| location.path.starts_with(c.root()))
            .max_by_key(|c| c.root().components().count())
            .cloned();

        trace!(
            path = %location.path.display(),
            context = ?found.as_ref().map(ExecutionContext::name),
            "context lookup"
        );
        found
    }
}

/// Toolchain homes from `[toolchain]` and per-context overrides.
///
/// Resolution order: the context's `toolchain_home`, then
/// `[toolchain].home`, then the variable named by `[toolchain].home_env`.
/// Empty values are skipped at every step.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredToolchain {
    overrides: BTreeMap<String, PathBuf>,
    home: Option<PathBuf>,
    home_env: Option<String>,
}

impl ConfiguredToolchain {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let overrides = cfg
            .context
            .iter()
            .filter_map(|(name, c)| {
                non_empty(c.toolchain_home.as_deref()).map(|home| (name.clone(), home))
            })
            .collect();

        Self {
            overrides,
            home: non_empty(cfg.toolchain.home.as_deref()),
            home_env: cfg
                .toolchain
                .home_env
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

impl ToolchainResolver for ConfiguredToolchain {
    fn resolve_toolchain(&self, context: &ExecutionContext) -> Option<PathBuf> {
        if let Some(home) = self.overrides.get(context.name()) {
            return Some(home.clone());
        }
        if let Some(home) = &self.home {
            return Some(home.clone());
        }

        let var = self.home_env.as_deref()?;
        let from_env = std::env::var(var).ok();
        let home = non_empty(from_env.as_deref());
        debug!(context = %context.name(), var, found = home.is_some(), "toolchain home from environment");
        home
    }
}

fn non_empty(value: Option<&str>) -> Option<PathBuf> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn absolutize(base_dir: &Path, root: &str) -> PathBuf {
    let root = Path::new(root.trim());
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        base_dir.join(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, parse_str};

    fn config(toml: &str) -> ConfigFile {
        let raw = parse_str(toml).expect("valid toml");
        ConfigFile::try_from(raw).expect("valid config")
    }

    #[test]
    fn longest_root_wins() {
        let cfg = config(
            r#"
[context.repo]
root = "."

[context.api]
root = "services/api"
"#,
        );
        let contexts = ConfiguredContexts::from_config(&cfg, Path::new("/work"));

        let api = contexts
            .find_context(&SourceLocation::new("/work/services/api/main.go"))
            .expect("api context");
        assert_eq!(api.name(), "api");
        assert_eq!(api.root(), Path::new("/work/services/api"));

        let repo = contexts
            .find_context(&SourceLocation::new("/work/tools/gen.go"))
            .expect("repo context");
        assert_eq!(repo.name(), "repo");

        assert!(contexts
            .find_context(&SourceLocation::new("/elsewhere/x.go"))
            .is_none());
    }

    #[test]
    fn implicit_context_without_declarations() {
        let cfg = config("");
        let contexts = ConfiguredContexts::from_config(&cfg, Path::new("/work"));
        let ctx = contexts.by_name(IMPLICIT_CONTEXT).expect("implicit context");
        assert_eq!(ctx.root(), Path::new("/work"));
    }

    #[test]
    fn override_beats_global_home() {
        let cfg = config(
            r#"
[toolchain]
home = "/opt/go"

[context.api]
root = "api"
toolchain_home = "/opt/go-next"

[context.web]
root = "web"
toolchain_home = ""
"#,
        );
        let contexts = ConfiguredContexts::from_config(&cfg, Path::new("/work"));
        let resolver = ConfiguredToolchain::from_config(&cfg);

        let api = contexts.by_name("api").expect("api");
        let web = contexts.by_name("web").expect("web");
        assert_eq!(resolver.resolve_toolchain(&api), Some(PathBuf::from("/opt/go-next")));
        assert_eq!(resolver.resolve_toolchain(&web), Some(PathBuf::from("/opt/go")));
    }

    #[test]
    fn empty_home_without_env_resolves_to_nothing() {
        let cfg = config(
            r#"
[toolchain]
home = "   "
"#,
        );
        let resolver = ConfiguredToolchain::from_config(&cfg);
        let ctx = ExecutionContext::new("app", "/work");
        assert_eq!(resolver.resolve_toolchain(&ctx), None);
    }

    #[test]
    fn home_env_is_consulted_last() {
        // Cargo sets this for every test process.
        let cfg = config(
            r#"
[toolchain]
home_env = "CARGO_MANIFEST_DIR"
"#,
        );
        let resolver = ConfiguredToolchain::from_config(&cfg);
        let ctx = ExecutionContext::new("app", "/work");
        assert_eq!(
            resolver.resolve_toolchain(&ctx),
            Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")))
        );
    }
}
