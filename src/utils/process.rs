//! External process execution with deadlines and cancellation.
//!
//! Every command the engine runs goes through [`run`]. The child is polled with
//! `wait-timeout`; when the [`ExecContext`] is cancelled or its deadline passes
//! the child (and on Unix its whole process group) is killed before the error
//! is returned.

use crate::error::{InstallError, Result};
use crate::platform::Platform;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Deadline and cancellation for one logical operation.
///
/// Clones share the cancellation flag, so a clone handed to another thread
/// can abort a command running on this one.
#[derive(Debug, Clone)]
pub struct ExecContext {
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl ExecContext {
    /// No deadline; only explicit cancellation stops a command.
    pub fn background() -> Self {
        Self {
            timeout: None,
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Deadline `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            deadline: Some(Instant::now() + timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::background()
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub command: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Turn a non-zero exit into `CommandFailed` carrying stderr verbatim.
    pub fn checked(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(InstallError::CommandFailed {
                command: self.command,
                exit_code: self.status.code(),
                stderr: self.stderr,
            })
        }
    }
}

/// Build a command that runs `line` through the platform shell.
pub fn shell_command(platform: &dyn Platform, line: &str) -> Command {
    let mut cmd = Command::new(platform.shell());
    cmd.arg(platform.shell_arg()).arg(line);
    cmd
}

/// Run a command line through the platform shell.
pub fn run_shell(ctx: &ExecContext, platform: &dyn Platform, line: &str) -> Result<CommandOutput> {
    run(ctx, shell_command(platform, line), line)
}

/// Run `program` with `args` directly, without a shell.
pub fn run_program(
    ctx: &ExecContext,
    program: &Path,
    args: &[&str],
) -> Result<CommandOutput> {
    let shown = std::iter::once(program.to_string_lossy().into_owned())
        .chain(args.iter().map(|a| a.to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    let mut cmd = Command::new(program);
    cmd.args(args);
    run(ctx, cmd, &shown)
}

/// Spawn `cmd`, capture stdout and stderr, and wait for it under `ctx`.
///
/// The deadline also covers draining the pipes, which a backgrounded
/// grandchild can hold open after the direct child has exited.
/// A non-zero exit is not an error here; see [`CommandOutput::checked`].
pub fn run(ctx: &ExecContext, mut cmd: Command, shown: &str) -> Result<CommandOutput> {
    if ctx.is_cancelled() {
        return Err(InstallError::Cancelled(shown.to_string()));
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!(command = %shown, "spawning");
    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => InstallError::CommandFailed {
            command: shown.to_string(),
            exit_code: None,
            stderr: format!("{}: command not found", shown),
        },
        _ => InstallError::Io(e),
    })?;

    let (tx, rx) = mpsc::channel();
    let mut pending = 0;
    if let Some(out) = child.stdout.take() {
        read_in_background(out, Stream::Stdout, tx.clone());
        pending += 1;
    }
    if let Some(err) = child.stderr.take() {
        read_in_background(err, Stream::Stderr, tx.clone());
        pending += 1;
    }
    drop(tx);

    let status = loop {
        if let Some(err) = interrupted(ctx, &mut child, shown) {
            return Err(err);
        }
        if let Some(status) = child.wait_timeout(next_wait(ctx))? {
            break status;
        }
    };

    let mut stdout = String::new();
    let mut stderr = String::new();
    while pending > 0 {
        if let Some(err) = interrupted(ctx, &mut child, shown) {
            return Err(err);
        }
        match rx.recv_timeout(next_wait(ctx)) {
            Ok((Stream::Stdout, text)) => {
                stdout = text;
                pending -= 1;
            }
            Ok((Stream::Stderr, text)) => {
                stderr = text;
                pending -= 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let output = CommandOutput {
        command: shown.to_string(),
        status,
        stdout,
        stderr,
    };
    debug!(command = %shown, code = ?output.status.code(), "finished");
    Ok(output)
}

fn next_wait(ctx: &ExecContext) -> Duration {
    ctx.remaining()
        .map_or(POLL_INTERVAL, |r| r.min(POLL_INTERVAL))
}

/// Kill the process group and build the error if `ctx` was cancelled or expired.
fn interrupted(ctx: &ExecContext, child: &mut Child, shown: &str) -> Option<InstallError> {
    if ctx.is_cancelled() {
        warn!(command = %shown, "cancelled, killing child");
        terminate(child);
        return Some(InstallError::Cancelled(shown.to_string()));
    }
    if ctx.is_expired() {
        let seconds = ctx.timeout().map(|t| t.as_secs()).unwrap_or_default();
        warn!(command = %shown, seconds, "timed out, killing child");
        terminate(child);
        return Some(InstallError::Timeout {
            command: shown.to_string(),
            seconds,
        });
    }
    None
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn read_in_background<R: Read + Send + 'static>(
    mut reader: R,
    stream: Stream,
    tx: Sender<(Stream, String)>,
) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
}

/// Kill the child and anything it spawned, then reap it.
///
/// Also called after the child has exited, when only its process group
/// is left. Reader threads are left detached.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let _ = Command::new("kill")
            .args(["-s", "KILL", "--"])
            .arg(format!("-{}", child.id()))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::platform::HostPlatform;

    #[test]
    fn test_run_shell_captures_streams_separately() {
        let ctx = ExecContext::background();
        let out = run_shell(&ctx, &HostPlatform::new(), "echo out; echo err >&2").unwrap();

        assert!(out.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(out.combined().contains("out"));
        assert!(out.combined().contains("err"));
    }

    #[test]
    fn test_checked_carries_stderr() {
        let ctx = ExecContext::background();
        let out = run_shell(&ctx, &HostPlatform::new(), "echo 'npm ERR! code E404' >&2; exit 3").unwrap();
        assert!(!out.success());

        match out.checked() {
            Err(InstallError::CommandFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "npm ERR! code E404\n");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills_child() {
        let ctx = ExecContext::with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = run_shell(&ctx, &HostPlatform::new(), "sleep 10").unwrap_err();

        assert!(matches!(err, InstallError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let ctx = ExecContext::background();
        let canceller = ctx.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            canceller.cancel();
        });

        let started = Instant::now();
        let err = run_shell(&ctx, &HostPlatform::new(), "sleep 10").unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, InstallError::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_covers_background_grandchild() {
        let ctx = ExecContext::with_timeout(Duration::from_millis(500));
        let started = Instant::now();
        let err = run_shell(&ctx, &HostPlatform::new(), "sleep 8 & echo started").unwrap_err();

        assert!(matches!(err, InstallError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_cancel_while_grandchild_holds_pipes() {
        let ctx = ExecContext::background();
        let canceller = ctx.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            canceller.cancel();
        });

        let started = Instant::now();
        let err = run_shell(&ctx, &HostPlatform::new(), "sleep 8 & exit 0").unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, InstallError::Cancelled(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_already_cancelled_does_not_spawn() {
        let ctx = ExecContext::background();
        ctx.cancel();
        let err = run_shell(&ctx, &HostPlatform::new(), "touch /tmp/should-not-exist").unwrap_err();
        assert!(matches!(err, InstallError::Cancelled(_)));
    }

    #[test]
    fn test_missing_program_is_command_failed() {
        let ctx = ExecContext::background();
        let err = run_program(&ctx, Path::new("definitely-not-a-real-binary-xyz"), &["--version"])
            .unwrap_err();
        let stderr = err.stderr().unwrap();
        assert!(stderr.contains("command not found"));
    }
}
