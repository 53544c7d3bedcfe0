// src/config/mod.rs

//! Configuration loading and validation for toolrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like unique context roots (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, load_and_validate, load_from_path, parse_str};
pub use model::{ConfigFile, ContextConfig, DefaultsSection, RawConfigFile, ToolchainSection};
