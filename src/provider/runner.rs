//! Subprocess execution for backend CLIs.
//!
//! [`run_cli`] spawns exactly one subprocess per call and drives its whole
//! lifecycle: stdin feed, incremental stdout/stderr capture, timeout with a
//! graceful-then-forceful kill sequence, and external cancellation. The
//! timeout-vs-exit-vs-cancel race is resolved at a single `select!` decision
//! point instead of competing event handlers.

use crate::provider::types::ProviderError;
use std::borrow::Cow;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Ceiling on captured stdout/stderr. Output past the cap is drained but
/// discarded so the child never blocks on a full pipe.
pub const MAX_CAPTURE_BYTES: usize = 8 * 1024 * 1024;

/// Wait after the graceful termination signal before force-killing.
const KILL_GRACE_MS: u64 = 1_000;

/// Characters of stdout carried into error messages for non-zero exits.
const ERROR_PREVIEW_CHARS: usize = 500;

/// One subprocess invocation of a backend executable.
#[derive(Debug, Clone)]
pub struct CliInvocation {
    pub executable: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub timeout_ms: u64,
}

/// Captured output of a successful (exit code 0) invocation.
#[derive(Debug)]
pub struct CliExecution {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the backend executable to completion, timeout, or cancellation.
pub async fn run_cli(
    backend: &str,
    invocation: CliInvocation,
    cancel: &tokio_util::sync::CancellationToken,
) -> Result<CliExecution, ProviderError> {
    debug!(
        backend,
        command = %render_command(&invocation),
        timeout_ms = invocation.timeout_ms,
        "spawning backend CLI"
    );

    let mut command = Command::new(&invocation.executable);
    command
        .args(&invocation.args)
        .stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| ProviderError::NotAvailable {
        backend: backend.to_string(),
        message: format!("failed to spawn '{}': {}", invocation.executable, e),
    })?;

    if let Some(payload) = &invocation.stdin
        && let Some(mut stdin) = child.stdin.take()
    {
        // A child that exits before reading its stdin produces a broken pipe;
        // that surfaces through the exit status, not as a spawn failure.
        if let Err(e) = stdin.write_all(payload.as_bytes()).await {
            debug!(backend, "failed to write prompt to stdin: {}", e);
        }
        drop(stdin);
    }

    let stdout_task = child.stdout.take().map(capture_stream);
    let stderr_task = child.stderr.take().map(capture_stream);

    let timeout = tokio::time::sleep(Duration::from_millis(invocation.timeout_ms));
    tokio::pin!(timeout);

    enum Outcome {
        Exited(std::io::Result<std::process::ExitStatus>),
        TimedOut,
        Cancelled,
    }

    // Cancellation and timeout are checked before the exit status so an exit
    // slipping in after expiry cannot win the race. Arms only produce a
    // value; the kill sequence runs after the wait future is dropped.
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Outcome::Cancelled,
        _ = &mut timeout => Outcome::TimedOut,
        status = child.wait() => Outcome::Exited(status),
    };

    let status = match outcome {
        Outcome::Cancelled => {
            warn!(backend, "execution cancelled, terminating subprocess");
            terminate(&mut child, backend).await;
            drain_capture(stdout_task).await;
            drain_capture(stderr_task).await;
            return Err(ProviderError::Cancelled {
                backend: backend.to_string(),
            });
        }
        Outcome::TimedOut => {
            warn!(
                backend,
                timeout_ms = invocation.timeout_ms,
                "execution timed out, terminating subprocess"
            );
            terminate(&mut child, backend).await;
            drain_capture(stdout_task).await;
            drain_capture(stderr_task).await;
            return Err(ProviderError::Timeout {
                backend: backend.to_string(),
                timeout_ms: invocation.timeout_ms,
            });
        }
        Outcome::Exited(status) => status.map_err(|e| ProviderError::Backend {
            backend: backend.to_string(),
            exit_code: None,
            message: format!("failed to wait for subprocess: {}", e),
        })?,
    };

    let stdout = drain_capture(stdout_task).await;
    let stderr = drain_capture(stderr_task).await;

    if status.success() {
        debug!(backend, stdout_bytes = stdout.len(), "backend CLI completed");
        return Ok(CliExecution { stdout, stderr });
    }

    // No exit code means the child was killed by an outside signal.
    if status.code().is_none() {
        return Err(ProviderError::Cancelled {
            backend: backend.to_string(),
        });
    }

    Err(classify_failure(backend, status.code(), &stdout, &stderr))
}

/// Maps a non-zero exit to a provider error, sniffing the diagnostic text for
/// authentication and rate-limit markers.
fn classify_failure(
    backend: &str,
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> ProviderError {
    let message = if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else if !stdout.trim().is_empty() {
        crate::provider::parser::preview(stdout.trim(), ERROR_PREVIEW_CHARS)
    } else {
        "unknown error".to_string()
    };

    let lowered = message.to_lowercase();
    if lowered.contains("login") || lowered.contains("api key") || lowered.contains("unauthorized")
    {
        return ProviderError::AuthFailed {
            backend: backend.to_string(),
            message,
        };
    }
    if lowered.contains("rate limit") || lowered.contains("429") {
        return ProviderError::RateLimited {
            backend: backend.to_string(),
            message,
        };
    }

    ProviderError::Backend {
        backend: backend.to_string(),
        exit_code,
        message,
    }
}

/// Graceful-then-forceful kill: SIGTERM, a bounded grace period, then SIGKILL.
async fn terminate(child: &mut Child, backend: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        match tokio::time::timeout(Duration::from_millis(KILL_GRACE_MS), child.wait()).await {
            Ok(_) => return,
            Err(_) => warn!(backend, "subprocess ignored SIGTERM, escalating to SIGKILL"),
        }
    }

    if let Err(e) = child.start_kill() {
        debug!(backend, "force kill failed (process likely gone): {}", e);
    }
    let _ = child.wait().await;
}

fn capture_stream<R>(stream: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut stream = stream;
        let mut captured = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if captured.len() < MAX_CAPTURE_BYTES {
                        let take = n.min(MAX_CAPTURE_BYTES - captured.len());
                        captured.extend_from_slice(&chunk[..take]);
                    }
                }
            }
        }
        String::from_utf8_lossy(&captured).into_owned()
    })
}

async fn drain_capture(task: Option<JoinHandle<String>>) -> String {
    match task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    }
}

/// Renders the invocation as a copy-pasteable shell command for debug logs.
fn render_command(invocation: &CliInvocation) -> String {
    std::iter::once(invocation.executable.as_str())
        .chain(invocation.args.iter().map(String::as_str))
        .map(|arg| shell_escape::escape(Cow::Borrowed(arg)).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
