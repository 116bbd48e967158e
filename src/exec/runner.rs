//! Supervised shell command execution.
//!
//! A job runs as `<shell> -c <command>`. Its stdout and stderr are read
//! concurrently and forwarded to an [`OutputSink`] as they arrive, while
//! the process exit is raced against the job timeout. Whichever finishes
//! first decides the outcome; a timed-out process group is SIGKILLed and its
//! late exit status is discarded.

use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::exec::output::OutputSink;

/// Upper bound on reading leftover output once the race is decided.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 8 * 1024;

/// One command invocation.
#[derive(Debug, Clone)]
pub struct Job {
    pub route: String,
    pub command: String,
    pub stdin: Option<Bytes>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecReport {
    pub output_bytes: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("run err: {0}")]
    Start(#[source] io::Error),

    #[error("run err code: {code}")]
    Exit { code: i32 },

    #[error("run err: {0}")]
    Terminated(String),

    #[error("run err: {0}")]
    Wait(#[source] io::Error),

    #[error("command timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl ExecError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecError::Start(_) => "start_failed",
            ExecError::Exit { .. } | ExecError::Terminated(_) | ExecError::Wait(_) => "failed",
            ExecError::Timeout(_) => "timeout",
        }
    }
}

/// Spawns jobs through a POSIX shell.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    shell: String,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self { shell: "sh".to_string() }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Run `job`, streaming its output into `sink`.
    ///
    /// A spawn failure returns at once; there is no process to wait on.
    pub async fn execute(&self, job: Job, sink: &mut dyn OutputSink) -> Result<ExecReport, ExecError> {
        let started = Instant::now();

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&job.command)
            .envs(job.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if job.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(ExecError::Start)?;
        let pid = child.id();
        tracing::debug!(route = %job.route, pid = ?pid, "Command started");

        if let (Some(input), Some(mut stdin)) = (job.stdin, child.stdin.take()) {
            let route = job.route.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!(route = %route, error = %e, "Command did not consume stdin");
                }
            });
        }

        let (tx, mut rx) = mpsc::channel::<Bytes>(32);
        let mut readers = JoinSet::new();
        if let Some(stdout) = child.stdout.take() {
            readers.spawn(pump(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.spawn(pump(stderr, tx.clone()));
        }
        drop(tx);

        let mut output_bytes = 0;
        let deadline = tokio::time::sleep(job.timeout);
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                Some(chunk) = rx.recv() => {
                    output_bytes += chunk.len();
                    sink.write(&chunk);
                }
                status = child.wait() => {
                    break match status {
                        Ok(status) if status.success() => Ok(()),
                        Ok(status) => match status.code() {
                            Some(code) => Err(ExecError::Exit { code }),
                            None => Err(ExecError::Terminated(status.to_string())),
                        },
                        Err(e) => Err(ExecError::Wait(e)),
                    };
                }
                _ = &mut deadline => {
                    tracing::warn!(route = %job.route, timeout = ?job.timeout, "Command timed out, killing");
                    kill(&mut child, pid).await;
                    break Err(ExecError::Timeout(job.timeout));
                }
            }
        };

        let drain = async {
            while let Some(chunk) = rx.recv().await {
                output_bytes += chunk.len();
                sink.write(&chunk);
            }
        };
        if tokio::time::timeout(OUTPUT_DRAIN_GRACE, drain).await.is_err() {
            tracing::warn!(route = %job.route, "Output still open after exit, detaching");
            readers.abort_all();
        }

        outcome.map(|()| ExecReport {
            output_bytes,
            elapsed: started.elapsed(),
        })
    }
}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::Sender<Bytes>) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Output pipe read failed");
                break;
            }
        }
    }
}

async fn kill(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        kill_group(pid);
    }
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "Failed to kill command");
    }
}

/// The shell leads its own process group; take any children down with it.
#[cfg(unix)]
fn kill_group(pid: u32) {
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        tracing::debug!(pid, error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(command: &str) -> Job {
        Job {
            route: "test".into(),
            command: command.into(),
            stdin: None,
            env: Vec::new(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn silent_success() {
        let mut out = Vec::new();
        let report = CommandExecutor::new().execute(job("true"), &mut out).await.unwrap();
        assert_eq!(report.output_bytes, 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let mut out = Vec::new();
        CommandExecutor::new()
            .execute(job("echo out; echo err >&2"), &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));
    }

    #[tokio::test]
    async fn non_zero_exit_reports_code() {
        let mut out = Vec::new();
        let err = CommandExecutor::new().execute(job("exit 3"), &mut out).await.unwrap_err();
        assert!(matches!(err, ExecError::Exit { code: 3 }));
        assert_eq!(err.to_string(), "run err code: 3");
    }

    #[tokio::test]
    async fn stdin_and_env_reach_the_process() {
        let mut job = job("cat; printf ' %s' \"$POST_KEY\"");
        job.stdin = Some(Bytes::from_static(b"hello"));
        job.env.push(("POST_KEY".into(), "value".into()));

        let mut out = Vec::new();
        CommandExecutor::new().execute(job, &mut out).await.unwrap();
        assert_eq!(out, b"hello value");
    }

    #[tokio::test]
    async fn timeout_kills_process_group() {
        let mut job = job("echo started; sleep 30; echo never");
        job.timeout = Duration::from_millis(300);

        let started = Instant::now();
        let mut out = Vec::new();
        let err = CommandExecutor::new().execute(job, &mut out).await.unwrap_err();

        assert!(matches!(err, ExecError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(out, b"started\n");
    }

    #[tokio::test]
    async fn missing_shell_fails_to_start() {
        let executor = CommandExecutor::new().with_shell("/nonexistent/shell");
        let mut out = Vec::new();
        let err = executor.execute(job("true"), &mut out).await.unwrap_err();
        assert!(matches!(err, ExecError::Start(_)));
        assert_eq!(err.kind(), "start_failed");
    }

    #[tokio::test]
    async fn background_children_do_not_hold_the_request() {
        let started = Instant::now();
        let mut out = Vec::new();
        CommandExecutor::new()
            .execute(job("sleep 30 & echo done"), &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"done\n");
        assert!(started.elapsed() < OUTPUT_DRAIN_GRACE * 3);
    }
}
