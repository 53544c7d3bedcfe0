// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Parse TOML text into a `RawConfigFile`.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// This is the recommended entry point for the rest of the application.
/// A missing file is not an error: every section has defaults, so running
/// without a config means "toolchain from the environment only".
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = if path.exists() {
        load_from_path(path)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        parse_str("")?
    };
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Directory that relative context roots are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "tools/Toolrun.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Toolrun.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
