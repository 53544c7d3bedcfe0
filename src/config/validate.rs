// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, ToolrunError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ToolrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.toolchain, raw.defaults, raw.context))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_toolchain(cfg)?;
    validate_defaults(cfg)?;
    validate_contexts(cfg)?;
    Ok(())
}

fn validate_toolchain(cfg: &RawConfigFile) -> Result<()> {
    let exe = cfg.toolchain.executable.trim();
    if exe.is_empty() {
        return Err(ToolrunError::ConfigError(
            "[toolchain].executable must not be empty".to_string(),
        ));
    }
    if exe.contains('/') || exe.contains('\\') {
        return Err(ToolrunError::ConfigError(format!(
            "[toolchain].executable must be a bare binary name, got '{exe}'"
        )));
    }
    Ok(())
}

fn validate_defaults(cfg: &RawConfigFile) -> Result<()> {
    if cfg.defaults.success_exit_codes.is_empty() {
        return Err(ToolrunError::ConfigError(
            "[defaults].success_exit_codes must list at least one exit code".to_string(),
        ));
    }
    Ok(())
}

fn validate_contexts(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();

    for (name, context) in cfg.context.iter() {
        let root = context.root.trim();
        if root.is_empty() {
            return Err(ToolrunError::ConfigError(format!(
                "context '{name}' has an empty `root`"
            )));
        }
        if let Some(other) = seen.insert(root, name.as_str()) {
            return Err(ToolrunError::ConfigError(format!(
                "contexts '{other}' and '{name}' share the root '{root}'"
            )));
        }
    }

    Ok(())
}
