//! Environment lifecycle controller.
//!
//! One [`Controller::run`] drives exactly one environment through
//! `validate → acquire → initialize → populate → activate → finalize`. Every
//! failure short-circuits to `finalize`; only failures before `acquire`
//! (validation, allocation) return without one. `finalize` consumes the
//! environment, so it runs at most once, and `run` calls it on every path
//! after `acquire`.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::core::lifecycle::{Disposition, Phase};
use crate::error::LifecycleError;
use crate::io::console::Console;
use crate::io::editor::Editor;
use crate::io::environment::{Environment, Finalized};
use crate::io::interrupt::Interrupt;
use crate::io::process::Finished;
use crate::io::toolchain::{Captured, InstallTarget, Toolchain};

/// Caller intent for one invocation.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Package specifiers to install after the requirements file.
    pub packages: Vec<String>,
    /// Requirements file installed before `packages`.
    pub requirements: Option<PathBuf>,
    /// Script to run instead of an interactive session.
    pub script: Option<PathBuf>,
    /// Leave the environment on disk at the end.
    pub keep: bool,
    /// Open the synthesized script in this editor instead of an interpreter.
    pub editor: Option<Editor>,
}

impl RunRequest {
    fn package_specs(&self) -> Vec<String> {
        self.packages
            .iter()
            .map(|spec| spec.trim())
            .filter(|spec| !spec.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Outcome of [`Controller::run`].
#[derive(Debug)]
pub struct RunReport {
    /// Process exit code for this invocation.
    pub exit_code: i32,
    /// The failure that ended the run early, if any.
    pub error: Option<LifecycleError>,
    /// Terminal step result; `None` only when the run stopped before `acquire`.
    pub finalized: Option<Finalized>,
}

impl RunReport {
    fn rejected(error: LifecycleError) -> Self {
        Self {
            exit_code: error.exit_code(),
            error: Some(error),
            finalized: None,
        }
    }

    /// Phases the environment went through (empty if none was acquired).
    pub fn history(&self) -> &[Phase] {
        self.finalized
            .as_ref()
            .map(|f| f.history.as_slice())
            .unwrap_or_default()
    }
}

pub struct Controller<'a, T: Toolchain> {
    toolchain: &'a T,
    interrupt: Interrupt,
    temp_base: Option<PathBuf>,
    console: Console,
}

impl<'a, T: Toolchain> Controller<'a, T> {
    pub fn new(toolchain: &'a T, interrupt: Interrupt) -> Self {
        Self {
            toolchain,
            interrupt,
            temp_base: None,
            console: Console::default(),
        }
    }

    /// Parent directory for environment roots (system temp dir when `None`).
    pub fn with_temp_base(mut self, base: Option<PathBuf>) -> Self {
        self.temp_base = base;
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Run the full lifecycle for `request`.
    #[instrument(skip_all, fields(packages = request.packages.len(), keep = request.keep))]
    pub fn run(&self, request: &RunRequest) -> RunReport {
        if let Err(err) = validate(request) {
            self.report_error(&err);
            return RunReport::rejected(err);
        }

        let mut env = match self.acquire() {
            Ok(env) => env,
            Err(err) => {
                self.report_error(&err);
                return RunReport::rejected(err);
            }
        };

        let outcome = self.drive(&mut env, request);
        if let Err(err) = &outcome {
            self.report_error(err);
        }
        let finalized = self.finalize(env, request.keep);

        let (exit_code, error) = match outcome {
            Ok(code) => (code, None),
            Err(err) => (err.exit_code(), Some(err)),
        };
        info!(exit_code, phases = ?finalized.history, "run finished");
        RunReport {
            exit_code,
            error,
            finalized: Some(finalized),
        }
    }

    fn drive(&self, env: &mut Environment, request: &RunRequest) -> Result<i32, LifecycleError> {
        self.checkpoint()?;
        self.initialize(env)?;
        self.populate(env, request.requirements.as_deref(), &request.package_specs())?;
        self.activate(env, request)
    }

    fn acquire(&self) -> Result<Environment, LifecycleError> {
        let env =
            Environment::acquire(self.temp_base.as_deref()).map_err(LifecycleError::Allocation)?;
        self.console.panel(
            "ghostenv",
            &format!("Created temporary environment in {}", env.root().display()),
        );
        Ok(env)
    }

    /// Create the virtual environment inside the acquired root.
    pub fn initialize(&self, env: &mut Environment) -> Result<(), LifecycleError> {
        self.console.step(format!(
            "Creating virtual environment at {}...",
            env.layout().venv_dir.display()
        ));
        let finished = self
            .toolchain
            .create_env(env)
            .map_err(|err| LifecycleError::Creation {
                detail: format!("{err:#}"),
            })?;
        let captured = completed(finished)?;
        self.checkpoint()?;
        if !captured.success() {
            return Err(LifecycleError::Creation {
                detail: failure_detail(&captured),
            });
        }
        env.enter(Phase::Created)?;
        Ok(())
    }

    /// Install the requirements file, then the explicit packages.
    pub fn populate(
        &self,
        env: &mut Environment,
        requirements: Option<&Path>,
        packages: &[String],
    ) -> Result<(), LifecycleError> {
        if let Some(path) = requirements {
            self.console.step(format!(
                "Installing from requirements file: {}",
                path.display()
            ));
            self.install_step(env, InstallTarget::Requirements(path.to_path_buf()))?;
            self.console.step("Requirements installed successfully.");
        }
        if !packages.is_empty() {
            self.console
                .step(format!("Installing packages: {}", packages.join(", ")));
            self.install_step(env, InstallTarget::Packages(packages.to_vec()))?;
            self.console.step("Packages installed successfully.");
        }
        Ok(())
    }

    fn install_step(
        &self,
        env: &mut Environment,
        target: InstallTarget,
    ) -> Result<(), LifecycleError> {
        env.enter(Phase::Installing)?;
        let finished =
            self.toolchain
                .install(env, &target)
                .map_err(|err| LifecycleError::Install {
                    command: install_command_line(env, &target),
                    output: format!("{err:#}"),
                })?;
        let captured = completed(finished)?;
        self.checkpoint()?;
        if !captured.success() {
            warn!(command = %captured.command, exit_code = ?captured.code, "install step failed");
            return Err(LifecycleError::Install {
                command: captured.command.clone(),
                output: captured.diagnostic().to_string(),
            });
        }
        Ok(())
    }

    /// Hand control to the user: the given script, an editor, or an interpreter session.
    pub fn activate(
        &self,
        env: &mut Environment,
        request: &RunRequest,
    ) -> Result<i32, LifecycleError> {
        env.enter(Phase::Active)?;

        if let Some(script) = &request.script {
            self.console
                .step(format!("Running script: {}", script.display()));
            let finished =
                self.toolchain
                    .run_script(env, script)
                    .map_err(|err| LifecycleError::Launch {
                        what: "script",
                        detail: format!("{err:#}"),
                    })?;
            let code = completed(finished)?;
            self.checkpoint()?;
            return Ok(code);
        }

        let script = env
            .write_test_script(&request.package_specs())
            .map_err(|err| LifecycleError::Launch {
                what: "test script",
                detail: format!("{err:#}"),
            })?;
        self.console
            .step(format!("Test script created at: {}", script.display()));

        if let Some(editor) = &request.editor {
            self.console
                .step(format!("Opening test script in {}...", editor.name));
            let finished = self
                .toolchain
                .open_editor(editor, &script)
                .map_err(|err| LifecycleError::Launch {
                    what: "editor",
                    detail: format!("{err:#}"),
                })?;
            let code = completed(finished)?;
            self.checkpoint()?;
            return Ok(code);
        }

        self.console.panel(
            "Interactive Session",
            &format!(
                "Starting Python REPL. Type `exit()` or `Ctrl+D` to quit.\nUsing python from: {}",
                env.interpreter().display()
            ),
        );
        let code = self
            .toolchain
            .run_interactive(env)
            .map_err(|err| LifecycleError::Launch {
                what: "interactive interpreter",
                detail: format!("{err:#}"),
            })?;
        if self.interrupt.clear() {
            debug!("Ctrl+C during the interactive session went to the interpreter");
        }
        Ok(code)
    }

    fn finalize(&self, env: Environment, retain: bool) -> Finalized {
        if !retain {
            self.console.step("Cleaning up temporary environment...");
        }
        let finalized = env.finalize(retain);
        match finalized.disposition {
            Disposition::Retained => self
                .console
                .report("Environment Kept", &retained_message(&finalized)),
            Disposition::Destroyed => match &finalized.cleanup_error {
                Some(err) => self.console.step(format!(
                    "Cleanup incomplete, {} may need manual removal: {err}",
                    finalized.root.display()
                )),
                None => self.console.step("Cleanup complete."),
            },
        }
        finalized
    }

    fn checkpoint(&self) -> Result<(), LifecycleError> {
        if self.interrupt.is_set() {
            return Err(LifecycleError::Interrupted);
        }
        Ok(())
    }

    fn report_error(&self, err: &LifecycleError) {
        match err {
            LifecycleError::Interrupted => self.console.alert("Operation cancelled by user."),
            LifecycleError::NoTargets => self.console.error(
                err.title(),
                &format!(
                    "Error: {err}.\nExample: ghostenv run requests pandas\nExample: ghostenv run -r requirements.txt"
                ),
            ),
            _ => self.console.error(err.title(), &err.to_string()),
        }
    }
}

/// Check the request before any environment exists.
pub fn validate(request: &RunRequest) -> Result<(), LifecycleError> {
    if request.package_specs().is_empty() && request.requirements.is_none() {
        return Err(LifecycleError::NoTargets);
    }
    if let Some(path) = &request.requirements {
        ensure_file("requirements file", path)?;
    }
    if let Some(path) = &request.script {
        ensure_file("script", path)?;
    }
    Ok(())
}

fn ensure_file(what: &'static str, path: &Path) -> Result<(), LifecycleError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LifecycleError::InvalidInput {
            what,
            path: path.to_path_buf(),
        })
    }
}

fn completed<V>(finished: Finished<V>) -> Result<V, LifecycleError> {
    match finished {
        Finished::Completed(value) => Ok(value),
        Finished::Interrupted => Err(LifecycleError::Interrupted),
    }
}

fn failure_detail(captured: &Captured) -> String {
    let status = captured
        .code
        .map_or_else(|| "a signal".to_string(), |code| format!("status {code}"));
    let diagnostic = captured.diagnostic();
    if diagnostic.is_empty() {
        format!("`{}` exited with {status}", captured.command)
    } else {
        format!("`{}` exited with {status}\n{diagnostic}", captured.command)
    }
}

fn install_command_line(env: &Environment, target: &InstallTarget) -> String {
    let args: Vec<String> = target
        .installer_args()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    format!("{} install {}", env.installer().display(), args.join(" "))
}

fn retained_message(finalized: &Finalized) -> String {
    let mut text = format!(
        "Environment saved at: {root}\nTo activate it later, run:\ncd {root} && {activate}",
        root = finalized.root.display(),
        activate = finalized.activate_command,
    );
    if let Some(script) = &finalized.script {
        text.push_str(&format!(
            "\n\nYour test script is saved at:\n{}",
            script.display()
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_targets() {
        let err = validate(&RunRequest::default()).unwrap_err();
        assert!(matches!(err, LifecycleError::NoTargets));

        let blank = RunRequest {
            packages: vec!["  ".to_string()],
            ..RunRequest::default()
        };
        assert!(matches!(
            validate(&blank).unwrap_err(),
            LifecycleError::NoTargets
        ));
    }

    #[test]
    fn validate_rejects_missing_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = RunRequest {
            requirements: Some(temp.path().join("missing.txt")),
            ..RunRequest::default()
        };
        let err = validate(&request).unwrap_err();
        assert!(err.to_string().contains("requirements file"));

        let request = RunRequest {
            packages: vec!["requests".to_string()],
            script: Some(temp.path().to_path_buf()),
            ..RunRequest::default()
        };
        let err = validate(&request).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidInput { what: "script", .. }
        ));
    }

    #[test]
    fn failure_detail_includes_diagnostic() {
        let captured = Captured {
            command: "python3 -m venv /tmp/x/venv".to_string(),
            code: Some(1),
            stdout: String::new(),
            stderr: "ensurepip is not available\n".to_string(),
        };
        assert_eq!(
            failure_detail(&captured),
            "`python3 -m venv /tmp/x/venv` exited with status 1\nensurepip is not available"
        );
    }

    #[test]
    fn retained_message_mentions_script() {
        let finalized = Finalized {
            disposition: Disposition::Retained,
            root: PathBuf::from("/tmp/ghostenv_x"),
            script: Some(PathBuf::from("/tmp/ghostenv_x/ghost_test.py")),
            activate_command: "source venv/bin/activate".to_string(),
            history: Vec::new(),
            cleanup_error: None,
        };
        let text = retained_message(&finalized);
        assert!(text.contains("cd /tmp/ghostenv_x && source venv/bin/activate"));
        assert!(text.ends_with("/tmp/ghostenv_x/ghost_test.py"));
    }
}
