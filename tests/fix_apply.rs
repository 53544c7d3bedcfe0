// tests/fix_apply.rs
mod common;
use crate::common::builders::{ConfigFileBuilder, StaticResolver, services};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::path::{Path, PathBuf};

use toolrun::context::{ConfiguredContexts, ConfiguredToolchain, SourceLocation};
use toolrun::fix::FetchPackageFix;
use toolrun::task::{Services, TaskRunner, TaskState, TokioScheduler};
use toolrun::types::{Presentation, Severity};
use toolrun_test_utils::{FakeLauncher, RecordingNotifier};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn fix_runs_get_in_the_owning_context() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_context("api", "services/api")
        .with_context_toolchain("web", "services/web", "/opt/go-web")
        .build();
    let contexts = ConfiguredContexts::from_config(&cfg, Path::new("/repo"));

    let launcher = FakeLauncher::new();
    let mut fake = launcher.control();
    let notifier = RecordingNotifier::new();
    let runner = TaskRunner::new(
        TokioScheduler::current()?,
        Services::new(
            std::sync::Arc::new(ConfiguredToolchain::from_config(&cfg)),
            std::sync::Arc::new(launcher),
            std::sync::Arc::new(notifier.clone()),
        ),
    );

    let fix = FetchPackageFix::new("golang.org/x/net", "go");
    let location = SourceLocation::new("/repo/services/web/main.go");
    let handle = fix
        .apply(&runner, &contexts, &location, false)
        .ok_or("fix should apply")?;
    assert_eq!(handle.presentation(), Presentation::Foreground);
    assert_eq!(handle.label(), "go get golang.org/x/net");

    with_timeout(fake.wait_for_launches(1)).await;
    let spec = fake.specs().remove(0);
    assert_eq!(spec.args, vec!["get", "golang.org/x/net"]);
    assert_eq!(spec.working_dir, PathBuf::from("/repo/services/web"));
    assert!(spec.program.starts_with("/opt/go-web/bin"));
    assert!(spec.capture_output);

    fake.exit(0, 0);
    let report = with_timeout(handle.wait()).await;
    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(notifier.messages()[0].1, Severity::Info);
    Ok(())
}

#[tokio::test]
async fn fix_does_not_apply_without_a_toolchain() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new().with_context("api", "services/api").build();
    let contexts = ConfiguredContexts::from_config(&cfg, Path::new("/repo"));

    let launcher = FakeLauncher::new();
    let fake = launcher.control();
    let notifier = RecordingNotifier::new();
    let runner = TaskRunner::new(
        TokioScheduler::current()?,
        services(StaticResolver::missing(), launcher, notifier.clone()),
    );

    let fix = FetchPackageFix::new("golang.org/x/net", "go");
    let handle = fix.apply(
        &runner,
        &contexts,
        &SourceLocation::new("/repo/services/api/main.go"),
        true,
    );

    assert!(handle.is_none());
    assert_eq!(fake.launch_count(), 0);
    assert!(notifier.messages().is_empty(), "not applicable is not an error");
    Ok(())
}

#[tokio::test]
async fn fix_does_not_apply_outside_any_context() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new().with_context("api", "services/api").build();
    let contexts = ConfiguredContexts::from_config(&cfg, Path::new("/repo"));
    let runner = TaskRunner::new(
        TokioScheduler::current()?,
        services(StaticResolver::at("/opt/go"), FakeLauncher::new(), RecordingNotifier::new()),
    );

    let fix = FetchPackageFix::new("golang.org/x/net", "go");
    assert!(
        fix.apply(&runner, &contexts, &SourceLocation::new("/elsewhere/main.go"), true)
            .is_none()
    );
    Ok(())
}

#[tokio::test]
async fn failed_fetch_notifies_with_the_fix_title() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new().build();
    let contexts = ConfiguredContexts::from_config(&cfg, Path::new("/repo"));

    let launcher = FakeLauncher::new();
    let mut fake = launcher.control();
    let notifier = RecordingNotifier::new();
    let runner = TaskRunner::new(
        TokioScheduler::current()?,
        services(StaticResolver::at("/opt/go"), launcher, notifier.clone()),
    );

    let fix = FetchPackageFix::new("example.com/missing", "go");
    let handle = fix
        .apply(&runner, &contexts, &SourceLocation::new("/repo/main.go"), true)
        .ok_or("implicit context owns the whole tree")?;

    with_timeout(fake.wait_for_launches(1)).await;
    fake.exit(0, 1);
    let report = with_timeout(handle.wait()).await;

    assert_eq!(report.state, TaskState::Failed);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, Severity::Error);
    assert!(messages[0].0.starts_with("Something went wrong with `go get`"));
    Ok(())
}
