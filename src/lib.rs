// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod exec;
pub mod fix;
pub mod logging;
pub mod notify;
pub mod task;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, config_root_dir, load_and_validate};
use crate::context::{
    ConfiguredContexts, ConfiguredToolchain, ContextLocator, SourceLocation, ToolchainResolver,
    usable_toolchain,
};
use crate::errors::ToolrunError;
use crate::exec::{Executor, LaunchConfig, OsProcessLauncher};
use crate::fix::FetchPackageFix;
use crate::notify::TracingNotifier;
use crate::task::{Services, TaskHandle, TaskRunner, TaskState, TokioScheduler};
use crate::types::Presentation;

/// Process exit code for a task that was cancelled (as after SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - context lookup and toolchain resolution
/// - the task runner on the current Tokio runtime
/// - Ctrl-C handling (mapped to a cancellation request)
///
/// Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let base_dir = std::path::absolute(config_root_dir(&config_path))?;

    let contexts = ConfiguredContexts::from_config(&cfg, &base_dir);
    let resolver = Arc::new(ConfiguredToolchain::from_config(&cfg));
    let services = Services::new(
        resolver.clone(),
        Arc::new(OsProcessLauncher),
        Arc::new(TracingNotifier),
    );
    let runner = TaskRunner::new(TokioScheduler::current()?, services);

    match &args.command {
        Command::Run {
            context,
            name,
            foreground,
            args: parameters,
        } => {
            let ctx = match context {
                Some(name) => contexts
                    .by_name(name)
                    .ok_or_else(|| ToolrunError::UnknownContext(name.clone()))?,
                None => {
                    let cwd = std::env::current_dir()?;
                    contexts
                        .find_context(&SourceLocation::new(&cwd))
                        .ok_or_else(|| {
                            ToolrunError::UnknownContext(format!("no context owns {}", cwd.display()))
                        })?
                }
            };

            let mut executor = Executor::in_context(ctx, cfg.toolchain.executable.clone())
                .with_parameters(parameters.iter().cloned())
                .with_success_exit_codes(cfg.defaults.success_exit_codes.iter().copied());
            if let Some(name) = name {
                executor = executor.with_presentable_name(name.clone());
            }
            if cfg.defaults.show_notifications {
                executor = executor.show_notifications();
            }
            if cfg.defaults.show_output_on_error {
                executor = executor.show_output_on_error();
            }
            let launch = executor.into_config();

            if args.dry_run {
                print_dry_run(&cfg, &contexts, &launch, resolver.as_ref());
                return Ok(0);
            }

            let handle = runner.submit(launch, run_in_background(*foreground, &cfg));
            Ok(supervise(handle).await)
        }

        Command::Get {
            package,
            file,
            foreground,
        } => {
            let fix = FetchPackageFix::new(package.clone(), cfg.toolchain.executable.clone());
            let location = SourceLocation::new(std::path::absolute(file)?);

            if args.dry_run {
                match contexts.find_context(&location) {
                    Some(ctx) => {
                        print_dry_run(&cfg, &contexts, &fix.launch_config(ctx), resolver.as_ref())
                    }
                    None => println!("no context owns {}", location.path.display()),
                }
                return Ok(0);
            }

            match fix.apply(&runner, &contexts, &location, run_in_background(*foreground, &cfg)) {
                Some(handle) => Ok(supervise(handle).await),
                None => {
                    info!(
                        fix = %fix.name(),
                        path = %location.path.display(),
                        "fix not applicable here; nothing to do"
                    );
                    Ok(0)
                }
            }
        }
    }
}

fn run_in_background(foreground_flag: bool, cfg: &ConfigFile) -> bool {
    !(foreground_flag || cfg.defaults.presentation == Presentation::Foreground)
}

/// Wait for a task, cancelling it on Ctrl-C, and map its final state to an
/// exit code.
async fn supervise(handle: TaskHandle) -> i32 {
    if handle.presentation() == Presentation::Foreground {
        let mut states = handle.subscribe();
        let label = handle.label().to_string();
        tokio::spawn(async move {
            loop {
                let state = *states.borrow_and_update();
                eprintln!("[{label}] {state}");
                if state.is_terminal() || states.changed().await.is_err() {
                    break;
                }
            }
        });
    }

    let report = tokio::select! {
        report = handle.wait() => report,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    info!(task_id = %handle.id(), "Ctrl-C received; cancelling task");
                    handle.request_cancel();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
            handle.wait().await
        }
    };

    match report.state {
        TaskState::Completed => 0,
        TaskState::Cancelled => EXIT_CANCELLED,
        _ => 1,
    }
}

/// Dry-run output: contexts and the resolved command line.
fn print_dry_run(
    cfg: &ConfigFile,
    contexts: &ConfiguredContexts,
    launch: &LaunchConfig,
    resolver: &dyn ToolchainResolver,
) {
    println!("toolrun dry-run");
    println!("  toolchain.executable = {}", cfg.toolchain.executable);
    println!();

    let all: Vec<_> = contexts.iter().collect();
    println!("contexts ({}):", all.len());
    for ctx in all {
        let home = usable_toolchain(resolver, ctx);
        println!("  - {} ({})", ctx.name(), ctx.root().display());
        match home {
            Some(home) => println!("      toolchain: {}", home.display()),
            None => println!("      toolchain: <not configured>"),
        }
    }
    println!();

    println!("launch:");
    println!("  label: {}", launch.presentable_name());
    println!("  context: {}", launch.context().name());
    match usable_toolchain(resolver, launch.context()) {
        Some(home) => {
            let spec = Executor::from_config(launch.clone()).command_spec(&home);
            println!("  program: {}", spec.program.display());
            println!("  args: {:?}", spec.args);
            println!("  dir: {}", spec.working_dir.display());
        }
        None => println!("  program: <no toolchain; execution would fail with a configuration error>"),
    }
    println!("  success_exit_codes: {:?}", launch.success_exit_codes());
    if launch.shows_notifications() {
        println!("  notifications: on");
    }
    if launch.shows_output_on_error() {
        println!("  output_on_error: on");
    }
}
