//! Test-only helpers: a scripted toolchain that records every call.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::io::editor::Editor;
use crate::io::environment::Environment;
use crate::io::interrupt::Interrupt;
use crate::io::process::Finished;
use crate::io::toolchain::{Captured, InstallTarget, Toolchain};

/// A toolchain call, in the order the controller made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateEnv,
    Install(InstallTarget),
    RunScript(PathBuf),
    RunInteractive,
    OpenEditor(String),
}

/// Predetermined result of one scripted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The child exits with `code`, writing `stderr`.
    Exit { code: i32, stderr: String },
    /// The child cannot be started.
    SpawnError(String),
    /// Ctrl+C arrives while the child runs.
    ///
    /// For the interactive session this means the interpreter saw Ctrl+C and
    /// the user then exited normally (code 0).
    Interrupt,
    /// Ctrl+C reaches the child, which exits with `code` on its own before the
    /// controller gets to kill it.
    ExitOnInterrupt { code: i32, stderr: String },
}

impl Step {
    pub fn ok() -> Self {
        Self::exit(0)
    }

    pub fn exit(code: i32) -> Self {
        Step::Exit {
            code,
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: &str) -> Self {
        Step::Exit {
            code,
            stderr: stderr.to_string(),
        }
    }
}

/// Toolchain that returns queued results without spawning processes.
///
/// Install steps are consumed in order; once the queue is empty every further
/// install succeeds. A successful `create_env` writes a stub interpreter into
/// the environment so the root is non-empty, like a real venv.
pub struct ScriptedToolchain {
    interrupt: Interrupt,
    calls: RefCell<Vec<Call>>,
    create: Step,
    installs: RefCell<VecDeque<Step>>,
    script: Step,
    interactive: Step,
    editor: Step,
}

impl ScriptedToolchain {
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            interrupt,
            calls: RefCell::new(Vec::new()),
            create: Step::ok(),
            installs: RefCell::new(VecDeque::new()),
            script: Step::ok(),
            interactive: Step::ok(),
            editor: Step::ok(),
        }
    }

    pub fn with_create(mut self, step: Step) -> Self {
        self.create = step;
        self
    }

    pub fn with_installs(self, steps: Vec<Step>) -> Self {
        *self.installs.borrow_mut() = steps.into();
        self
    }

    pub fn with_script(mut self, step: Step) -> Self {
        self.script = step;
        self
    }

    pub fn with_interactive(mut self, step: Step) -> Self {
        self.interactive = step;
        self
    }

    pub fn with_editor(mut self, step: Step) -> Self {
        self.editor = step;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn captured(&self, command: String, step: &Step) -> Result<Finished<Captured>> {
        match step {
            Step::Exit { code, stderr } => Ok(Finished::Completed(Captured {
                command,
                code: Some(*code),
                stdout: String::new(),
                stderr: stderr.clone(),
            })),
            Step::SpawnError(message) => Err(anyhow!("{message}")),
            Step::Interrupt => {
                self.interrupt.trigger();
                Ok(Finished::Interrupted)
            }
            Step::ExitOnInterrupt { code, stderr } => {
                self.interrupt.trigger();
                Ok(Finished::Completed(Captured {
                    command,
                    code: Some(*code),
                    stdout: String::new(),
                    stderr: stderr.clone(),
                }))
            }
        }
    }

    fn exit_code(&self, step: &Step) -> Result<Finished<i32>> {
        match step {
            Step::Exit { code, .. } => Ok(Finished::Completed(*code)),
            Step::SpawnError(message) => Err(anyhow!("{message}")),
            Step::Interrupt => {
                self.interrupt.trigger();
                Ok(Finished::Interrupted)
            }
            Step::ExitOnInterrupt { code, .. } => {
                self.interrupt.trigger();
                Ok(Finished::Completed(*code))
            }
        }
    }
}

impl Toolchain for ScriptedToolchain {
    fn create_env(&self, env: &Environment) -> Result<Finished<Captured>> {
        self.record(Call::CreateEnv);
        if self.create == Step::ok() {
            let interpreter = env.interpreter();
            if let Some(bin) = interpreter.parent() {
                fs::create_dir_all(bin)?;
            }
            fs::write(interpreter, "stub interpreter\n")?;
        }
        self.captured("python3 -m venv venv".to_string(), &self.create)
    }

    fn install(&self, _env: &Environment, target: &InstallTarget) -> Result<Finished<Captured>> {
        self.record(Call::Install(target.clone()));
        let step = self.installs.borrow_mut().pop_front().unwrap_or_else(Step::ok);
        let args: Vec<String> = target
            .installer_args()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        self.captured(format!("pip install {}", args.join(" ")), &step)
    }

    fn run_script(&self, _env: &Environment, script: &Path) -> Result<Finished<i32>> {
        self.record(Call::RunScript(script.to_path_buf()));
        self.exit_code(&self.script)
    }

    fn run_interactive(&self, _env: &Environment) -> Result<i32> {
        self.record(Call::RunInteractive);
        match &self.interactive {
            Step::Exit { code, .. } => Ok(*code),
            Step::SpawnError(message) => Err(anyhow!("{message}")),
            Step::Interrupt => {
                self.interrupt.trigger();
                Ok(0)
            }
            Step::ExitOnInterrupt { code, .. } => {
                self.interrupt.trigger();
                Ok(*code)
            }
        }
    }

    fn open_editor(&self, editor: &Editor, _script: &Path) -> Result<Finished<i32>> {
        self.record(Call::OpenEditor(editor.name.clone()));
        self.exit_code(&self.editor)
    }
}
