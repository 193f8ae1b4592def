//! `ghostenv` command-line entry point.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use ghostenv::controller::{Controller, RunRequest};
use ghostenv::exit_codes;
use ghostenv::io::config::{CONFIG_ENV, GhostenvConfig, default_config_path, load_config};
use ghostenv::io::console::Console;
use ghostenv::io::editor::{self, EditorChoice};
use ghostenv::io::interrupt::Interrupt;
use ghostenv::io::toolchain::PythonToolchain;
use ghostenv::logging;

#[derive(Parser)]
#[command(
    name = "ghostenv",
    version,
    about = "Temporary, disposable virtual environments for testing pip packages"
)]
struct Cli {
    /// Config file (default: <config dir>/ghostenv/config.toml).
    #[arg(long, global = true, value_name = "PATH", env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Debug logging to stderr (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Defaults to `run` with no arguments.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a temporary environment, install packages, and start a REPL.
    Run(RunArgs),
    /// Print the ghostenv version.
    Version,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Package specifiers to install (e.g. `requests "pandas>=2"`).
    packages: Vec<String>,

    /// Requirements file, installed before the listed packages.
    #[arg(short, long, value_name = "PATH")]
    requirements: Option<PathBuf>,

    /// Python script to run in the environment instead of a REPL.
    #[arg(long = "run", value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Keep the temporary environment after exiting.
    #[arg(long)]
    keep: bool,

    /// Open the test script in an editor instead of a REPL (`--ide=code`; bare `--ide` picks one).
    #[arg(
        long,
        value_name = "EDITOR",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "auto",
        conflicts_with = "script"
    )]
    ide: Option<String>,

    /// Base interpreter used to create the environment.
    #[arg(long, value_name = "PATH", env = "GHOSTENV_PYTHON")]
    python: Option<String>,

    /// Only show errors and the final report.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let Cli {
        config, command, ..
    } = cli;
    match command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => cmd_run(config.as_deref(), args),
        Command::Version => {
            println!("ghostenv version {}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_run(config_path: Option<&Path>, args: RunArgs) -> Result<i32> {
    let config = resolve_config(config_path)?;
    let interrupt = Interrupt::install()?;

    let mut toolchain = PythonToolchain::new(&config, interrupt.clone());
    if let Some(python) = args.python {
        toolchain = toolchain.with_python(python);
    }

    let editor = match args.ide.as_deref() {
        Some(value) => Some(editor::resolve(&editor_choice(value, &config))?),
        None => None,
    };

    let request = RunRequest {
        packages: args.packages,
        requirements: args.requirements,
        script: args.script,
        keep: args.keep,
        editor,
    };
    let report = Controller::new(&toolchain, interrupt)
        .with_temp_base(config.temp_dir.clone())
        .with_console(Console::new(args.quiet))
        .run(&request);
    Ok(report.exit_code)
}

fn resolve_config(explicit: Option<&Path>) -> Result<GhostenvConfig> {
    let path = explicit.map(Path::to_path_buf).or_else(default_config_path);
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        }
        None => Ok(GhostenvConfig::default()),
    }
}

/// `auto` defers to the configured default editor when there is one.
fn editor_choice(value: &str, config: &GhostenvConfig) -> EditorChoice {
    match EditorChoice::parse(value) {
        EditorChoice::Auto => config
            .editor
            .default
            .as_deref()
            .map_or(EditorChoice::Auto, EditorChoice::parse),
        named => named,
    }
}
