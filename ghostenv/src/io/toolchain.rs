//! Toolchain abstraction for the processes an environment needs.
//!
//! The [`Toolchain`] trait decouples the lifecycle controller from the actual
//! interpreter and installer (currently `python -m venv` and `pip`). Tests use
//! scripted toolchains that record calls and return predetermined results
//! without spawning processes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::io::config::GhostenvConfig;
use crate::io::editor::Editor;
use crate::io::environment::Environment;
use crate::io::interrupt::Interrupt;
use crate::io::process::{
    CommandOutput, Finished, describe, exit_code, run_captured, run_foreground, run_inherited,
};

/// Captured result of a creation or install step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// Command line that produced this output.
    pub command: String,
    /// Exit code, `None` if the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Diagnostic text for the user: stderr, or stdout when stderr is empty.
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }

    fn from_output(command: String, output: CommandOutput, label: &str) -> Self {
        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        stdout.push_str(&output.stdout_truncated_notice(label));
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        stderr.push_str(&output.stderr_truncated_notice(label));
        Self {
            command,
            code: output.status.code(),
            stdout,
            stderr,
        }
    }
}

/// What a single install step installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallTarget {
    /// `pip install -r <file>`.
    Requirements(PathBuf),
    /// `pip install <spec>...`.
    Packages(Vec<String>),
}

impl InstallTarget {
    pub fn installer_args(&self) -> Vec<OsString> {
        match self {
            InstallTarget::Requirements(path) => vec!["-r".into(), path.into()],
            InstallTarget::Packages(specs) => specs.iter().map(OsString::from).collect(),
        }
    }
}

/// Abstraction over the external processes of the environment lifecycle.
pub trait Toolchain {
    /// Create the isolated environment inside `env`'s root.
    fn create_env(&self, env: &Environment) -> Result<Finished<Captured>>;

    /// Run one installer step against `env`.
    fn install(&self, env: &Environment, target: &InstallTarget) -> Result<Finished<Captured>>;

    /// Run `script` with the environment's interpreter; returns its exit code.
    fn run_script(&self, env: &Environment, script: &Path) -> Result<Finished<i32>>;

    /// Hand the terminal to the environment's interpreter; returns its exit code.
    fn run_interactive(&self, env: &Environment) -> Result<i32>;

    /// Open `script` in `editor` and wait for it to close; returns its exit code.
    fn open_editor(&self, editor: &Editor, script: &Path) -> Result<Finished<i32>>;
}

/// Toolchain backed by a real Python interpreter and pip.
#[derive(Debug, Clone)]
pub struct PythonToolchain {
    python: String,
    interrupt: Interrupt,
    poll: Duration,
    output_limit_bytes: usize,
    extra_install_args: Vec<String>,
}

impl PythonToolchain {
    pub fn new(config: &GhostenvConfig, interrupt: Interrupt) -> Self {
        Self {
            python: config.python.clone(),
            interrupt,
            poll: config.poll_interval(),
            output_limit_bytes: config.output_limit_bytes,
            extra_install_args: config.install.extra_args.clone(),
        }
    }

    /// Override the base interpreter used for environment creation.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    fn base_interpreter(&self) -> Result<PathBuf> {
        which::which(&self.python)
            .map_err(|e| anyhow!("interpreter `{}` not found on PATH: {e}", self.python))
    }

    fn captured(&self, cmd: Command, label: &str) -> Result<Finished<Captured>> {
        let command = describe(&cmd);
        let finished = run_captured(cmd, &self.interrupt, self.poll, self.output_limit_bytes)
            .with_context(|| format!("run {command}"))?;
        Ok(finished.map(|output| Captured::from_output(command, output, label)))
    }
}

impl Toolchain for PythonToolchain {
    #[instrument(skip_all, fields(python = %self.python))]
    fn create_env(&self, env: &Environment) -> Result<Finished<Captured>> {
        let python = self.base_interpreter()?;
        info!(venv = %env.layout().venv_dir.display(), "creating virtual environment");
        let mut cmd = Command::new(python);
        cmd.arg("-m").arg("venv").arg(&env.layout().venv_dir);
        let finished = self.captured(cmd, "venv")?;
        if let Finished::Completed(captured) = &finished
            && captured.success()
            && !env.interpreter().exists()
        {
            warn!(interpreter = %env.interpreter().display(), "venv reported success but interpreter is missing");
            return Ok(Finished::Completed(Captured {
                code: Some(1),
                stderr: format!(
                    "environment interpreter missing at {}",
                    env.interpreter().display()
                ),
                ..captured.clone()
            }));
        }
        Ok(finished)
    }

    #[instrument(skip_all, fields(target = ?target))]
    fn install(&self, env: &Environment, target: &InstallTarget) -> Result<Finished<Captured>> {
        let mut cmd = Command::new(env.installer());
        cmd.arg("install")
            .args(&self.extra_install_args)
            .args(target.installer_args());
        let finished = self.captured(cmd, "pip")?;
        if let Finished::Completed(captured) = &finished {
            debug!(exit_code = ?captured.code, "pip finished");
        }
        Ok(finished)
    }

    #[instrument(skip_all, fields(script = %script.display()))]
    fn run_script(&self, env: &Environment, script: &Path) -> Result<Finished<i32>> {
        let mut cmd = Command::new(env.interpreter());
        cmd.arg(script);
        let finished = run_inherited(cmd, &self.interrupt, self.poll)
            .with_context(|| format!("run script {}", script.display()))?;
        Ok(finished.map(exit_code))
    }

    #[instrument(skip_all)]
    fn run_interactive(&self, env: &Environment) -> Result<i32> {
        let cmd = Command::new(env.interpreter());
        let status = run_foreground(cmd).context("start interactive interpreter")?;
        Ok(exit_code(status))
    }

    #[instrument(skip_all, fields(editor = %editor.name))]
    fn open_editor(&self, editor: &Editor, script: &Path) -> Result<Finished<i32>> {
        let finished = run_inherited(editor.command(script), &self.interrupt, self.poll)
            .with_context(|| format!("open {} in {}", script.display(), editor.name))?;
        Ok(finished.map(exit_code))
    }
}
