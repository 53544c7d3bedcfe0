// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Task failures have their own taxonomy in [`crate::task::TaskError`]; the
//! errors here cover loading configuration and wiring the application.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown execution context: {0}")]
    UnknownContext(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ToolrunError>;
