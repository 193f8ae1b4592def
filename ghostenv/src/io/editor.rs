//! Opening the synthesized test script in an editor or IDE.
//!
//! This sits beside the lifecycle: the controller only reaches it from
//! `activate` when the user asked for an editor instead of an interactive
//! interpreter. The editor must block until closed, so GUI editors that
//! support it are started with their wait flag.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, anyhow, bail};
use tracing::debug;

/// Editors probed by `--ide auto`, in order, with the flags that make them block.
const KNOWN_EDITORS: &[(&str, &[&str])] = &[
    ("code", &["--wait"]),
    ("cursor", &["--wait"]),
    ("codium", &["--wait"]),
    ("zed", &["--wait"]),
    ("subl", &["--wait"]),
    ("pycharm", &["--wait"]),
    ("nvim", &[]),
    ("vim", &[]),
    ("nano", &[]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorChoice {
    /// `$VISUAL`, `$EDITOR`, then the first known editor on `PATH`.
    Auto,
    /// An editor command, optionally with arguments (`"code --wait"`).
    Named(String),
}

impl EditorChoice {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            EditorChoice::Auto
        } else {
            EditorChoice::Named(value.to_string())
        }
    }
}

/// A resolved editor executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Editor {
    pub fn command(&self, script: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(script);
        cmd
    }
}

/// Resolve `choice` against `PATH` and the process environment.
pub fn resolve(choice: &EditorChoice) -> Result<Editor> {
    resolve_with(
        choice,
        |name| which::which(name).ok(),
        |key| std::env::var(key).ok(),
    )
}

fn resolve_with<L, V>(choice: &EditorChoice, lookup: L, var: V) -> Result<Editor>
where
    L: Fn(&str) -> Option<PathBuf>,
    V: Fn(&str) -> Option<String>,
{
    match choice {
        EditorChoice::Named(spec) => from_spec(spec, &lookup)
            .ok_or_else(|| anyhow!("editor `{spec}` not found on PATH")),
        EditorChoice::Auto => {
            let from_env = ["VISUAL", "EDITOR"]
                .into_iter()
                .filter_map(|key| var(key))
                .filter(|spec| !spec.trim().is_empty())
                .find_map(|spec| from_spec(&spec, &lookup));
            if let Some(editor) = from_env {
                return Ok(editor);
            }
            for (name, _) in KNOWN_EDITORS {
                if let Some(editor) = from_spec(name, &lookup) {
                    return Ok(editor);
                }
            }
            bail!("no editor found; set $EDITOR or pass --ide <EDITOR>")
        }
    }
}

/// Build an editor from `"program [args...]"`. Known editors get their wait flags
/// unless explicit arguments were given.
fn from_spec<L: Fn(&str) -> Option<PathBuf>>(spec: &str, lookup: &L) -> Option<Editor> {
    let mut parts = spec.split_whitespace();
    let program = parts.next()?;
    let explicit: Vec<String> = parts.map(str::to_string).collect();
    let resolved = lookup(program)?;

    let name = Path::new(program)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string());
    let args = if explicit.is_empty() {
        wait_args(&name)
    } else {
        explicit
    };
    debug!(name = %name, program = %resolved.display(), ?args, "resolved editor");
    Some(Editor {
        name,
        program: resolved,
        args,
    })
}

fn wait_args(name: &str) -> Vec<String> {
    KNOWN_EDITORS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, args)| args.iter().map(|a| a.to_string()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_path(available: &'static [&'static str]) -> impl Fn(&str) -> Option<PathBuf> {
        move |name| {
            available
                .iter()
                .any(|candidate| *candidate == name)
                .then(|| PathBuf::from("/usr/bin").join(name))
        }
    }

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parse_auto_and_named() {
        assert_eq!(EditorChoice::parse(""), EditorChoice::Auto);
        assert_eq!(EditorChoice::parse("AUTO"), EditorChoice::Auto);
        assert_eq!(
            EditorChoice::parse("code"),
            EditorChoice::Named("code".to_string())
        );
    }

    #[test]
    fn named_known_editor_gets_wait_flag() {
        let editor =
            resolve_with(&EditorChoice::parse("code"), on_path(&["code"]), no_vars).expect("code");
        assert_eq!(editor.program, PathBuf::from("/usr/bin/code"));
        assert_eq!(editor.args, vec!["--wait"]);
    }

    #[test]
    fn explicit_args_replace_wait_flag() {
        let editor = resolve_with(
            &EditorChoice::parse("code --new-window --wait"),
            on_path(&["code"]),
            no_vars,
        )
        .expect("code");
        assert_eq!(editor.args, vec!["--new-window", "--wait"]);
    }

    #[test]
    fn auto_prefers_editor_variable() {
        let vars = |key: &str| (key == "EDITOR").then(|| "nano".to_string());
        let editor =
            resolve_with(&EditorChoice::Auto, on_path(&["code", "nano"]), vars).expect("auto");
        assert_eq!(editor.name, "nano");
        assert!(editor.args.is_empty());
    }

    #[test]
    fn auto_falls_back_to_known_editors() {
        let editor =
            resolve_with(&EditorChoice::Auto, on_path(&["vim", "subl"]), no_vars).expect("auto");
        assert_eq!(editor.name, "subl");
    }

    #[test]
    fn missing_editor_is_an_error() {
        let err = resolve_with(&EditorChoice::parse("emacs"), on_path(&[]), no_vars).unwrap_err();
        assert!(err.to_string().contains("`emacs` not found"));

        let err = resolve_with(&EditorChoice::Auto, on_path(&[]), no_vars).unwrap_err();
        assert!(err.to_string().contains("no editor found"));
    }

    #[test]
    fn command_appends_script() {
        let editor = Editor {
            name: "code".to_string(),
            program: PathBuf::from("/usr/bin/code"),
            args: vec!["--wait".to_string()],
        };
        let cmd = editor.command(Path::new("/tmp/ghost_test.py"));
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["--wait", "/tmp/ghost_test.py"]);
    }
}
