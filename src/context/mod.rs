// src/context/mod.rs

//! Execution contexts and the collaborators that resolve them.
//!
//! - [`ExecutionContext`] is the unit a command runs under: a name, a working
//!   directory and a disposal flag.
//! - [`ContextLocator`] maps a location in user content to a context.
//! - [`ToolchainResolver`] finds the toolchain installation for a context.
//!
//! Absence is a normal answer from both traits. Config-backed
//! implementations live in [`configured`].

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod configured;

pub use configured::{ConfiguredContexts, ConfiguredToolchain};

/// Shared handle to the context a command runs in.
///
/// Clones refer to the same context, so disposing one clone is observed by
/// every task holding another.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    name: String,
    root: PathBuf,
    disposed: AtomicBool,
}

impl ExecutionContext {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                name: name.into(),
                root: root.into(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Working directory for commands run in this context.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Mark the context as gone. Tasks that have not spawned yet will not.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

/// A location in user content (a file, for the CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Maps a source location to the context a command should run under.
pub trait ContextLocator: Send + Sync + Debug {
    /// `None` means "no applicable context" and must be treated as a silent
    /// no-op by callers.
    fn find_context(&self, location: &SourceLocation) -> Option<ExecutionContext>;
}

/// Looks up the toolchain installation for a context.
pub trait ToolchainResolver: Send + Sync + Debug {
    /// Toolchain home directory, if one is configured.
    fn resolve_toolchain(&self, context: &ExecutionContext) -> Option<PathBuf>;
}

/// Resolve a toolchain home and drop empty answers, so every caller treats
/// `Some("")` the same as `None`.
pub fn usable_toolchain(
    resolver: &dyn ToolchainResolver,
    context: &ExecutionContext,
) -> Option<PathBuf> {
    resolver
        .resolve_toolchain(context)
        .filter(|home| !home.as_os_str().is_empty())
}

/// Path of `executable` inside a toolchain home (`<home>/bin/<exe>`).
pub fn executable_path(home: &Path, executable: &str) -> PathBuf {
    home.join("bin")
        .join(format!("{executable}{}", std::env::consts::EXE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(Option<PathBuf>);

    impl ToolchainResolver for Fixed {
        fn resolve_toolchain(&self, _context: &ExecutionContext) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    #[test]
    fn empty_toolchain_home_is_unusable() {
        let ctx = ExecutionContext::new("app", "/tmp");
        assert_eq!(usable_toolchain(&Fixed(Some(PathBuf::new())), &ctx), None);
        assert_eq!(usable_toolchain(&Fixed(None), &ctx), None);
        assert_eq!(
            usable_toolchain(&Fixed(Some(PathBuf::from("/opt/go"))), &ctx),
            Some(PathBuf::from("/opt/go"))
        );
    }

    #[test]
    fn disposal_is_shared_between_clones() {
        let ctx = ExecutionContext::new("app", "/tmp");
        let other = ctx.clone();
        ctx.dispose();
        assert!(other.is_disposed());
    }

    #[cfg(unix)]
    #[test]
    fn executable_lives_under_bin() {
        assert_eq!(
            executable_path(Path::new("/usr/local/go"), "go"),
            PathBuf::from("/usr/local/go/bin/go")
        );
    }
}
