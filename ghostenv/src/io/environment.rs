//! The ephemeral environment owned by one invocation.
//!
//! An [`Environment`] owns its root directory from [`Environment::acquire`] until
//! [`Environment::finalize`], which consumes it. Dropping an environment that was
//! never finalized (only possible while unwinding from a panic) removes the root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::core::layout::{Layout, Platform};
use crate::core::lifecycle::{Disposition, Lifecycle, Phase, TransitionError};
use crate::core::script::{TEST_SCRIPT_NAME, render_test_script};

/// Name prefix of every environment root.
pub const ROOT_PREFIX: &str = "ghostenv_";

#[derive(Debug)]
pub struct Environment {
    root: PathBuf,
    layout: Layout,
    script: Option<PathBuf>,
    lifecycle: Lifecycle,
}

/// Result of the terminal lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub disposition: Disposition,
    pub root: PathBuf,
    /// Synthesized test script, if one was written.
    pub script: Option<PathBuf>,
    /// Command that activates the environment from inside `root`.
    pub activate_command: String,
    /// Every phase the environment entered, ending with `Finalized`.
    pub history: Vec<Phase>,
    /// Suppressed removal failure, if destruction was incomplete.
    pub cleanup_error: Option<String>,
}

impl Environment {
    /// Allocate a uniquely named root directory under `base` (system temp dir if `None`).
    #[instrument(skip_all, fields(base = ?base))]
    pub fn acquire(base: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(ROOT_PREFIX);
        let dir = match base {
            Some(base) => {
                fs::create_dir_all(base)?;
                builder.tempdir_in(base)?
            }
            None => builder.tempdir()?,
        };
        let root = dir.keep();
        info!(root = %root.display(), "acquired environment root");
        Ok(Self {
            layout: Layout::for_root(&root, Platform::host()),
            root,
            script: None,
            lifecycle: Lifecycle::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn interpreter(&self) -> &Path {
        &self.layout.interpreter
    }

    pub fn installer(&self) -> &Path {
        &self.layout.installer
    }

    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Move to a live phase. `Finalized` is only reachable through [`Environment::finalize`].
    pub fn enter(&mut self, next: Phase) -> Result<(), TransitionError> {
        if next.is_terminal() {
            return Err(TransitionError {
                from: self.lifecycle.phase(),
                to: next,
            });
        }
        debug!(from = %self.lifecycle.phase(), to = %next, "lifecycle transition");
        self.lifecycle.advance(next)
    }

    /// Write the test script seeded with imports for `packages` into the root.
    pub fn write_test_script<S: AsRef<str>>(&mut self, packages: &[S]) -> Result<PathBuf> {
        let path = self.root.join(TEST_SCRIPT_NAME);
        fs::write(&path, render_test_script(packages))
            .with_context(|| format!("write test script {}", path.display()))?;
        debug!(path = %path.display(), "test script written");
        self.script = Some(path.clone());
        Ok(path)
    }

    /// Retain or destroy the root. Removal errors are logged and recorded, never raised.
    #[instrument(skip_all, fields(root = %self.root.display(), retain))]
    pub fn finalize(mut self, retain: bool) -> Finalized {
        let disposition = if retain {
            Disposition::Retained
        } else {
            Disposition::Destroyed
        };

        let cleanup_error = match disposition {
            Disposition::Retained => None,
            Disposition::Destroyed => remove_root(&self.root),
        };

        if let Err(err) = self.lifecycle.advance(Phase::Finalized(disposition)) {
            error!(%err, "environment finalized twice");
        }
        info!(?disposition, "environment finalized");

        Finalized {
            disposition,
            root: self.root.clone(),
            script: self.script.clone(),
            activate_command: self.layout.activate_command(),
            history: self.lifecycle.history().to_vec(),
            cleanup_error,
        }
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if !self.lifecycle.is_finalized() {
            warn!(root = %self.root.display(), "environment dropped without finalize, removing");
            remove_root(&self.root);
        }
    }
}

fn remove_root(root: &Path) -> Option<String> {
    match fs::remove_dir_all(root) {
        Ok(()) => None,
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(err = %e, root = %root.display(), "failed to remove environment root");
            Some(e.to_string())
        }
    }
}
