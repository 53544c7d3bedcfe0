//! Fakes and builders shared by the `toolrun` integration tests.

pub mod builders;
pub mod fake_launcher;
pub mod manual_scheduler;
pub mod recording_notifier;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

pub use fake_launcher::{DestroyBehaviour, FakeLauncher, LauncherControl};
pub use manual_scheduler::ManualScheduler;
pub use recording_notifier::RecordingNotifier;

/// Upper bound for anything a test awaits.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness, which only shows it for
/// failing tests. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another harness may have installed a subscriber already.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `fut`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_TIMEOUT, fut).await {
        Ok(out) => out,
        Err(_) => panic!("test step did not finish within {TEST_TIMEOUT:?}"),
    }
}
