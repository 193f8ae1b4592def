//! On-disk layout of a virtual environment inside an environment root.
//!
//! Every path here is a pure function of the root and the platform; nothing is
//! probed on disk.

use std::path::{Path, PathBuf};

/// Directory name of the virtual environment under the root.
pub const VENV_DIR: &str = "venv";

/// Directory layout convention of the host interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `bin/python`, `bin/pip`.
    Posix,
    /// `Scripts\python.exe`, `Scripts\pip.exe`.
    Windows,
}

impl Platform {
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    fn bin_dir(self) -> &'static str {
        match self {
            Platform::Posix => "bin",
            Platform::Windows => "Scripts",
        }
    }

    fn executable(self, stem: &str) -> String {
        match self {
            Platform::Posix => stem.to_string(),
            Platform::Windows => format!("{stem}.exe"),
        }
    }
}

/// Derived paths of the environment living under `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub platform: Platform,
    pub venv_dir: PathBuf,
    pub interpreter: PathBuf,
    pub installer: PathBuf,
}

impl Layout {
    pub fn for_root(root: &Path, platform: Platform) -> Self {
        let venv_dir = root.join(VENV_DIR);
        let bin = venv_dir.join(platform.bin_dir());
        Self {
            platform,
            interpreter: bin.join(platform.executable("python")),
            installer: bin.join(platform.executable("pip")),
            venv_dir,
        }
    }

    /// Shell command that activates the environment, relative to the root.
    pub fn activate_command(&self) -> String {
        match self.platform {
            Platform::Posix => format!("source {VENV_DIR}/bin/activate"),
            Platform::Windows => format!("{VENV_DIR}\\Scripts\\activate.bat"),
        }
    }
}
