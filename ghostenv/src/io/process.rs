//! Helpers for running child processes with interruptible waits and bounded output.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::interrupt::Interrupt;

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long an interrupted capture waits for its output readers.
const READER_GRACE: Duration = Duration::from_millis(500);

/// How a blocking child step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finished<T> {
    /// The child exited on its own.
    Completed(T),
    /// Ctrl+C was observed while waiting; the child was killed.
    Interrupted,
}

impl<T> Finished<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Finished<U> {
        match self {
            Finished::Completed(value) => Finished::Completed(f(value)),
            Finished::Interrupted => Finished::Interrupted,
        }
    }
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl CommandOutput {
    pub fn stdout_truncated_notice(&self, label: &str) -> String {
        if self.stdout_truncated > 0 {
            format!(
                "\n[{label} stdout truncated {} bytes]\n",
                self.stdout_truncated
            )
        } else {
            String::new()
        }
    }

    pub fn stderr_truncated_notice(&self, label: &str) -> String {
        if self.stderr_truncated > 0 {
            format!(
                "\n[{label} stderr truncated {} bytes]\n",
                self.stderr_truncated
            )
        } else {
            String::new()
        }
    }
}

/// Run a command to completion, capturing stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
/// The child is killed if `interrupt` is set before it exits.
#[instrument(skip_all, fields(program = ?cmd.get_program(), output_limit_bytes))]
pub fn run_captured(
    mut cmd: Command,
    interrupt: &Interrupt,
    poll: Duration,
    output_limit_bytes: usize,
) -> Result<Finished<CommandOutput>> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = spawn(&mut cmd)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let Some(status) = wait_interruptible(&mut child, interrupt, poll)? else {
        release_readers([stdout_handle, stderr_handle]);
        return Ok(Finished::Interrupted);
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(Finished::Completed(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    }))
}

/// Run a command sharing this process's stdin/stdout/stderr.
///
/// The child is killed if `interrupt` is set before it exits.
#[instrument(skip_all, fields(program = ?cmd.get_program()))]
pub fn run_inherited(
    mut cmd: Command,
    interrupt: &Interrupt,
    poll: Duration,
) -> Result<Finished<ExitStatus>> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let mut child = spawn(&mut cmd)?;
    let finished = match wait_interruptible(&mut child, interrupt, poll)? {
        Some(status) => Finished::Completed(status),
        None => Finished::Interrupted,
    };
    Ok(finished)
}

/// Hand the terminal to a child and wait until it exits.
///
/// Ctrl+C reaches the child through the terminal, so it is not treated as a
/// reason to stop waiting here.
#[instrument(skip_all, fields(program = ?cmd.get_program()))]
pub fn run_foreground(mut cmd: Command) -> Result<ExitStatus> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let mut child = spawn(&mut cmd)?;
    let status = child.wait().context("wait for foreground command")?;
    debug!(exit_code = ?status.code(), "foreground command finished");
    Ok(status)
}

/// Exit code to report for a finished child.
///
/// Signal terminations map to `128 + signal` on Unix, like a shell would.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Human-readable command line for error messages.
pub fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| {
            let part = part.to_string_lossy();
            if part.contains(char::is_whitespace) {
                format!("\"{part}\"")
            } else {
                part.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn spawn(cmd: &mut Command) -> Result<Child> {
    debug!("spawning child process");
    match cmd.spawn() {
        Ok(child) => Ok(child),
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            Err(e).with_context(|| format!("spawn {}", describe(cmd)))
        }
    }
}

/// Wait for `child`, checking `interrupt` every `poll`. Returns `None` if interrupted.
///
/// A terminal Ctrl+C reaches the child too, so a child that exits while the
/// flag is set counts as interrupted whatever its status.
fn wait_interruptible(
    child: &mut Child,
    interrupt: &Interrupt,
    poll: Duration,
) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.wait_timeout(poll).context("wait for command")? {
            if interrupt.is_set() {
                debug!(exit_code = ?status.code(), "child exited after interrupt");
                return Ok(None);
            }
            return Ok(Some(status));
        }
        if interrupt.is_set() {
            warn!("interrupt observed, killing child");
            // The child may have exited between the poll and the kill.
            if let Err(e) = child.kill() {
                debug!(err = %e, "kill after interrupt failed");
            }
            child.wait().context("wait command after kill")?;
            return Ok(None);
        }
    }
}

/// Join reader threads of an interrupted child within [`READER_GRACE`].
///
/// Grandchildren may keep the pipes open past the child's death; readers still
/// running after the grace period are detached.
type Reader = thread::JoinHandle<Result<(Vec<u8>, usize)>>;

fn release_readers<const N: usize>(handles: [Reader; N]) {
    let deadline = Instant::now() + READER_GRACE;
    while handles.iter().any(|h| !h.is_finished()) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    let mut detached = 0usize;
    for handle in handles {
        if handle.is_finished() {
            if let Err(e) = join_output(handle) {
                debug!(err = %e, "output reader failed after interrupt");
            }
        } else {
            detached += 1;
        }
    }
    if detached > 0 {
        debug!(detached, "output readers still blocked after interrupt, detaching");
    }
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
