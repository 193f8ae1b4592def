//! User configuration stored in `<config dir>/ghostenv/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::process::DEFAULT_OUTPUT_LIMIT_BYTES;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GHOSTENV_CONFIG";

/// ghostenv configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GhostenvConfig {
    /// Base interpreter used to create environments (name on `PATH` or a path).
    pub python: String,

    /// Parent directory for environment roots. System temp dir when unset.
    pub temp_dir: Option<PathBuf>,

    /// How often blocking waits check for Ctrl+C, in milliseconds.
    pub poll_interval_ms: u64,

    /// Truncate captured creation/installer output beyond this many bytes.
    pub output_limit_bytes: usize,

    pub install: InstallConfig,

    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallConfig {
    /// Extra arguments passed to every `pip install` (e.g. `["--index-url", "..."]`).
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// Editor used by `--ide` when no name is given on the command line.
    pub default: Option<String>,
}

impl Default for GhostenvConfig {
    fn default() -> Self {
        Self {
            python: default_python().to_string(),
            temp_dir: None,
            poll_interval_ms: 100,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            install: InstallConfig::default(),
            editor: EditorConfig::default(),
        }
    }
}

impl GhostenvConfig {
    pub fn validate(&self) -> Result<()> {
        if self.python.trim().is_empty() {
            return Err(anyhow!("python must be a non-empty string"));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self
            .editor
            .default
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(anyhow!("editor.default must not be empty when set"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_python() -> &'static str {
    if cfg!(windows) { "python" } else { "python3" }
}

/// Default config location, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ghostenv").join("config.toml"))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GhostenvConfig::default()`.
pub fn load_config(path: &Path) -> Result<GhostenvConfig> {
    if !path.exists() {
        let cfg = GhostenvConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GhostenvConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
