//! Child process execution with wall-clock timeouts and bounded capture.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes discarded from stdout beyond the capture limit.
    pub stdout_truncated: usize,
    /// Bytes discarded from stderr beyond the capture limit.
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `cmd` with a hard timeout, draining stdout/stderr concurrently so the
/// child can never block on a full pipe.
///
/// At most `limit_bytes` of each stream is kept; anything beyond that is
/// drained and counted as truncated. On timeout the child is killed and the
/// captured-so-far output is returned with `timed_out` set.
pub fn run_with_timeout(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
    limit_bytes: usize,
) -> Result<CommandOutput> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdout_handle = thread::spawn(move || read_limited(stdout, limit_bytes));
    let stderr_handle = thread::spawn(move || read_limited(stderr, limit_bytes));

    // Readers are already draining the output pipes, so writing stdin here
    // cannot deadlock against a chatty child.
    if let Some(input) = stdin {
        let mut child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        child_stdin.write_all(input).context("write stdin")?;
    }

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_reader(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_reader(stderr_handle).context("join stderr")?;
    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        let keep = n.min(remaining);
        buf.extend_from_slice(&chunk[..keep]);
        truncated += n - keep;
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let output = run_with_timeout(
            sh("echo out; echo err >&2"),
            None,
            Duration::from_secs(5),
            10_000,
        )
        .expect("run");

        assert!(output.status.success());
        assert!(!output.timed_out);
        assert_eq!(output.stdout_lossy(), "out\n");
        assert_eq!(output.stderr_lossy(), "err\n");
    }

    #[test]
    fn forwards_stdin() {
        let output = run_with_timeout(
            sh("cat"),
            Some(b"hello from stdin"),
            Duration::from_secs(5),
            10_000,
        )
        .expect("run");

        assert_eq!(output.stdout_lossy(), "hello from stdin");
    }

    #[test]
    fn bounds_captured_output() {
        let output = run_with_timeout(
            sh("printf 'abcdefghij'"),
            None,
            Duration::from_secs(5),
            4,
        )
        .expect("run");

        assert_eq!(output.stdout, b"abcd");
        assert_eq!(output.stdout_truncated, 6);
    }

    #[test]
    fn kills_the_child_on_timeout() {
        let started = Instant::now();
        let output = run_with_timeout(sh("sleep 5"), None, Duration::from_secs(1), 10_000)
            .expect("run");

        assert!(output.timed_out);
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
