//! Failure taxonomy of the environment lifecycle.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::lifecycle::TransitionError;
use crate::exit_codes;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Neither packages nor a requirements file were given.
    #[error("you must specify packages to install or a requirements file")]
    NoTargets,

    /// A path argument does not name a readable regular file.
    #[error("{what} {} is not a file", .path.display())]
    InvalidInput { what: &'static str, path: PathBuf },

    /// No temporary root could be allocated.
    #[error("failed to allocate a temporary environment directory")]
    Allocation(#[source] io::Error),

    /// The environment-creation collaborator failed.
    #[error("failed to create virtual environment: {detail}")]
    Creation { detail: String },

    /// An installer step exited unsuccessfully or could not be run.
    #[error("failed to run command: `{command}`\n\nPip output:\n{output}")]
    Install { command: String, output: String },

    /// The user script, interpreter or editor could not be started.
    #[error("failed to start {what}: {detail}")]
    Launch { what: &'static str, detail: String },

    /// Ctrl+C was observed.
    #[error("operation cancelled by user")]
    Interrupted,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl LifecycleError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LifecycleError::Interrupted => exit_codes::INTERRUPTED,
            _ => exit_codes::FAILURE,
        }
    }

    /// Panel title used when reporting this error.
    pub fn title(&self) -> &'static str {
        match self {
            LifecycleError::Install { .. } => "Installation Error",
            LifecycleError::NoTargets | LifecycleError::InvalidInput { .. } => "Usage Error",
            _ => "Error",
        }
    }
}
