// tests/config_loading.rs
mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use toolrun::config::{ConfigFile, load_and_validate, parse_str};
use toolrun::context::{
    ConfiguredContexts, ConfiguredToolchain, ContextLocator, SourceLocation, ToolchainResolver,
};
use toolrun::errors::ToolrunError;
use toolrun::types::Presentation;

type TestResult = Result<(), Box<dyn Error>>;

fn demo_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/toolrun.toml")
}

fn validate(toml: &str) -> Result<ConfigFile, ToolrunError> {
    ConfigFile::try_from(parse_str(toml)?)
}

#[test]
fn demo_config_loads() -> TestResult {
    init_tracing();

    let cfg = load_and_validate(demo_config())?;
    assert_eq!(cfg.toolchain.executable, "go");
    assert_eq!(cfg.toolchain.home_env.as_deref(), Some("GOROOT"));
    assert_eq!(cfg.defaults.presentation, Presentation::Background);
    assert_eq!(cfg.context.len(), 2);
    assert_eq!(
        cfg.context["api"].toolchain_home.as_deref(),
        Some("/usr/local/go")
    );
    Ok(())
}

#[test]
fn demo_contexts_resolve_by_location() -> TestResult {
    init_tracing();

    let cfg = load_and_validate(demo_config())?;
    let base = Path::new("/repo");
    let contexts = ConfiguredContexts::from_config(&cfg, base);

    let api = contexts
        .find_context(&SourceLocation::new("/repo/services/api/cmd/main.go"))
        .ok_or("api context")?;
    assert_eq!(api.name(), "api");
    assert_eq!(api.root(), Path::new("/repo/services/api"));

    assert!(
        contexts
            .find_context(&SourceLocation::new("/repo/tools/gen.go"))
            .is_none()
    );

    let resolver = ConfiguredToolchain::from_config(&cfg);
    assert_eq!(
        resolver.resolve_toolchain(&api),
        Some(PathBuf::from("/usr/local/go"))
    );
    Ok(())
}

#[test]
fn missing_file_falls_back_to_defaults() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let cfg = load_and_validate(dir.path().join("Toolrun.toml"))?;

    assert_eq!(cfg.toolchain.executable, "go");
    assert_eq!(cfg.defaults.success_exit_codes, vec![0]);
    assert!(cfg.context.is_empty());
    Ok(())
}

#[test]
fn file_on_disk_is_parsed() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let path = dir.path().join("Toolrun.toml");
    fs::write(
        &path,
        r#"
[toolchain]
home = "/opt/go"
executable = "gofmt"

[defaults]
success_exit_codes = [0, 1]
presentation = "foreground"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.toolchain.home.as_deref(), Some("/opt/go"));
    assert_eq!(cfg.toolchain.executable, "gofmt");
    assert_eq!(cfg.defaults.success_exit_codes, vec![0, 1]);
    assert_eq!(cfg.defaults.presentation, Presentation::Foreground);
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() {
    init_tracing();

    let err = validate("[toolchain\nhome = 1").unwrap_err();
    assert!(matches!(err, ToolrunError::TomlError(_)), "got {err:?}");
}

#[test]
fn executable_must_be_a_bare_name() {
    init_tracing();

    let err = validate("[toolchain]\nexecutable = \"/usr/bin/go\"\n").unwrap_err();
    assert!(err.to_string().contains("bare binary name"), "got {err}");

    let err = validate("[toolchain]\nexecutable = \"  \"\n").unwrap_err();
    assert!(err.to_string().contains("must not be empty"), "got {err}");
}

#[test]
fn success_codes_must_not_be_empty() {
    init_tracing();

    let err = validate("[defaults]\nsuccess_exit_codes = []\n").unwrap_err();
    assert!(matches!(err, ToolrunError::ConfigError(_)));
}

#[test]
fn context_roots_must_be_set_and_distinct() {
    init_tracing();

    let err = validate("[context.a]\nroot = \"\"\n").unwrap_err();
    assert!(err.to_string().contains("empty `root`"), "got {err}");

    let err = validate("[context.a]\nroot = \"svc\"\n\n[context.b]\nroot = \"svc\"\n").unwrap_err();
    assert!(err.to_string().contains("share the root"), "got {err}");
}

#[test]
fn builder_config_passes_validation() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_toolchain_home("/opt/go")
        .with_context("api", "services/api")
        .with_context_toolchain("legacy", "services/legacy", "/opt/go1.19")
        .build();

    let resolver = ConfiguredToolchain::from_config(&cfg);
    let contexts = ConfiguredContexts::from_config(&cfg, Path::new("/repo"));

    let legacy = contexts.by_name("legacy").expect("legacy context");
    let api = contexts.by_name("api").expect("api context");
    assert_eq!(resolver.resolve_toolchain(&legacy), Some(PathBuf::from("/opt/go1.19")));
    assert_eq!(resolver.resolve_toolchain(&api), Some(PathBuf::from("/opt/go")));
}
