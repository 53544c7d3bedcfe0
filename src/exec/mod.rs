// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running toolchain commands,
//! using `tokio::process::Command`, and handing the caller an owning handle.
//!
//! - [`process`] holds `ProcessHandle`, the owning wrapper around one
//!   process and its exit signal.
//! - [`launcher`] provides the `ProcessLauncher` trait and the concrete
//!   `OsProcessLauncher`, which tests can replace with a fake.
//! - [`executor`] turns a `LaunchConfig` into a command line and spawns it.

pub mod executor;
pub mod launcher;
pub mod process;

pub use executor::{Executor, LaunchConfig};
pub use launcher::{CommandSpec, OsProcessLauncher, ProcessLauncher};
pub use process::{CapturedOutput, ExitSignal, ProcessController, ProcessExit, ProcessHandle};
