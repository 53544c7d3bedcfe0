use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, watch};
use toolrun::exec::{CapturedOutput, CommandSpec, ProcessExit, ProcessHandle, ProcessLauncher};

type LaunchHook = Arc<dyn Fn() + Send + Sync>;

/// What a fake process does when it receives a destroy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyBehaviour {
    /// Report `ProcessExit::Destroyed` (what a real kill looks like).
    Destroyed,
    /// Report a normal exit with this code, as if the process exited on its
    /// own at the same instant.
    ExitWith(i32),
}

/// A launcher that spawns no OS processes.
///
/// - records every `CommandSpec` it was asked to launch
/// - keeps each fake process alive until the test calls [`FakeLauncher::exit`]
///   or the owner destroys it
/// - counts destroy requests that actually reached a fake process
/// - optionally holds back the report of a natural exit, the way a real
///   supervisor does while it drains output
pub struct FakeLauncher {
    specs: Arc<Mutex<Vec<CommandSpec>>>,
    exits: Arc<Mutex<HashMap<usize, oneshot::Sender<(i32, CapturedOutput)>>>>,
    destroys: Arc<AtomicUsize>,
    next_index: AtomicUsize,
    launches: watch::Sender<usize>,
    natural_exits: Arc<watch::Sender<usize>>,
    reports_released: Arc<watch::Sender<bool>>,
    fail_with: Option<io::ErrorKind>,
    on_destroy: DestroyBehaviour,
    hold_reports: bool,
    hook: Option<LaunchHook>,
}

impl std::fmt::Debug for FakeLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeLauncher")
            .field("launches", &self.launch_count())
            .field("destroys", &self.destroy_count())
            .finish_non_exhaustive()
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLauncher {
    pub fn new() -> Self {
        let (launches, _) = watch::channel(0);
        let (natural_exits, _) = watch::channel(0);
        let (reports_released, _) = watch::channel(false);
        Self {
            specs: Arc::new(Mutex::new(Vec::new())),
            exits: Arc::new(Mutex::new(HashMap::new())),
            destroys: Arc::new(AtomicUsize::new(0)),
            next_index: AtomicUsize::new(0),
            launches,
            natural_exits: Arc::new(natural_exits),
            reports_released: Arc::new(reports_released),
            fail_with: None,
            on_destroy: DestroyBehaviour::Destroyed,
            hold_reports: false,
            hook: None,
        }
    }

    /// Every launch fails with an OS error of this kind (after recording).
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            fail_with: Some(kind),
            ..Self::new()
        }
    }

    pub fn on_destroy(mut self, behaviour: DestroyBehaviour) -> Self {
        self.on_destroy = behaviour;
        self
    }

    /// After a natural exit, stop accepting destroy requests but keep the
    /// exit unreported until [`LauncherControl::release_exit_reports`].
    pub fn holding_exit_reports(mut self) -> Self {
        self.hold_reports = true;
        self
    }

    /// Run `hook` inside `launch`, after the fake process exists but before
    /// the handle is returned to the caller.
    pub fn with_launch_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// A handle for observing and driving this launcher after it has been
    /// moved into `Services`.
    pub fn control(&self) -> LauncherControl {
        LauncherControl {
            specs: Arc::clone(&self.specs),
            exits: Arc::clone(&self.exits),
            destroys: Arc::clone(&self.destroys),
            launches: self.launches.subscribe(),
            natural_exits: self.natural_exits.subscribe(),
            reports_released: Arc::clone(&self.reports_released),
        }
    }

    pub fn launch_count(&self) -> usize {
        *self.launches.borrow()
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, spec: &CommandSpec) -> io::Result<ProcessHandle> {
        self.specs.lock().unwrap().push(spec.clone());

        if let Some(kind) = self.fail_with {
            return Err(io::Error::new(kind, "fake launch failure"));
        }

        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let (exit_tx, exit_rx) = oneshot::channel::<(i32, CapturedOutput)>();
        self.exits.lock().unwrap().insert(index, exit_tx);

        let (handle, mut controller) = ProcessHandle::new(Some(10_000 + index as u32));
        let destroys = Arc::clone(&self.destroys);
        let natural_exits = Arc::clone(&self.natural_exits);
        let mut released = self.reports_released.subscribe();
        let hold_reports = self.hold_reports;
        let on_destroy = self.on_destroy;

        tokio::spawn(async move {
            let exit = tokio::select! {
                explicit = controller.destroyed() => {
                    if explicit {
                        destroys.fetch_add(1, Ordering::SeqCst);
                    }
                    match on_destroy {
                        DestroyBehaviour::Destroyed => ProcessExit::Destroyed {
                            output: CapturedOutput::default(),
                        },
                        DestroyBehaviour::ExitWith(code) => ProcessExit::Exited {
                            code,
                            output: CapturedOutput::default(),
                        },
                    }
                }
                requested = exit_rx => {
                    controller.seal();
                    natural_exits.send_modify(|n| *n += 1);
                    if hold_reports {
                        let _ = released.wait_for(|r| *r).await;
                    }
                    match requested {
                        Ok((code, output)) => ProcessExit::Exited { code, output },
                        Err(_) => ProcessExit::Exited {
                            code: -1,
                            output: CapturedOutput::default(),
                        },
                    }
                }
            };
            controller.finish(exit);
        });

        self.launches.send_modify(|n| *n += 1);

        if let Some(hook) = &self.hook {
            hook();
        }

        Ok(handle)
    }
}

/// Test-side view of a [`FakeLauncher`].
#[derive(Debug, Clone)]
pub struct LauncherControl {
    specs: Arc<Mutex<Vec<CommandSpec>>>,
    exits: Arc<Mutex<HashMap<usize, oneshot::Sender<(i32, CapturedOutput)>>>>,
    destroys: Arc<AtomicUsize>,
    launches: watch::Receiver<usize>,
    natural_exits: watch::Receiver<usize>,
    reports_released: Arc<watch::Sender<bool>>,
}

impl LauncherControl {
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().unwrap().clone()
    }

    /// Number of successful launches (failed launches are only in `specs`).
    pub fn launch_count(&self) -> usize {
        *self.launches.borrow()
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` processes have been launched.
    pub async fn wait_for_launches(&mut self, n: usize) {
        self.launches
            .wait_for(|count| *count >= n)
            .await
            .expect("fake launcher dropped");
    }

    /// Wait until at least `n` fake processes have seen their natural exit
    /// and stopped accepting destroy requests.
    pub async fn wait_for_natural_exits(&mut self, n: usize) {
        self.natural_exits
            .wait_for(|count| *count >= n)
            .await
            .expect("fake launcher dropped");
    }

    /// Let held-back exits be reported (see
    /// [`FakeLauncher::holding_exit_reports`]).
    pub fn release_exit_reports(&self) {
        self.reports_released.send_replace(true);
    }

    /// Let the `index`-th launched process exit with `code`.
    pub fn exit(&self, index: usize, code: i32) {
        self.exit_with_output(index, code, CapturedOutput::default());
    }

    pub fn exit_with_output(&self, index: usize, code: i32, output: CapturedOutput) {
        let tx = self
            .exits
            .lock()
            .unwrap()
            .remove(&index)
            .expect("no running fake process with that index");
        let _ = tx.send((code, output));
    }
}
