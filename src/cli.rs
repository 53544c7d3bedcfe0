// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `toolrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "toolrun",
    version,
    about = "Run toolchain commands in the background, cancellable at any point.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Toolrun.toml` in the current working directory. A missing
    /// file means "all defaults".
    #[arg(long, value_name = "PATH", default_value = "Toolrun.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TOOLRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the command line, but don't execute it.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the toolchain executable with the given arguments.
    Run {
        /// Context to run in. Defaults to the context owning the current
        /// directory.
        #[arg(long, value_name = "NAME")]
        context: Option<String>,

        /// Label shown in logs and notifications.
        #[arg(long, value_name = "LABEL")]
        name: Option<String>,

        /// Follow the task's progress instead of running it in the background.
        #[arg(long)]
        foreground: bool,

        /// Arguments passed to the executable.
        #[arg(last = true, required = true, value_name = "ARGS")]
        args: Vec<String>,
    },

    /// Fetch a package (`<exe> get <package>`) for the context owning a file.
    Get {
        package: String,

        /// File whose context the package is fetched for.
        #[arg(long, value_name = "PATH", default_value = ".")]
        file: PathBuf,

        /// Follow the task's progress instead of running it in the background.
        #[arg(long)]
        foreground: bool,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
