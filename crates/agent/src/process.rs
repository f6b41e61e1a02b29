//! [`ProcessRunner`] backed by `tokio::process`.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clawbridge_core::error::InvokeError;
use clawbridge_core::{ProcessOutcome, ProcessRunner, ProcessSpec};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

const READ_BUF: usize = 8 * 1024;

/// Runs real child processes. stdout and stderr are read concurrently and
/// appended to one buffer in arrival order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        spec: &ProcessSpec,
        timeout: Duration,
    ) -> Result<ProcessOutcome, InvokeError> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| InvokeError::Launch {
            command: spec.program.clone(),
            reason: e.to_string(),
        })?;
        debug!(pid = ?child.id(), command = %spec.program, "Agent process started");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = tokio::time::timeout(timeout, async {
            let output = read_merged(stdout, stderr).await?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, output))
        })
        .await;

        match finished {
            Ok(Ok((status, output))) => Ok(ProcessOutcome::Exited {
                code: status.code().unwrap_or(-1),
                output,
                elapsed: started.elapsed(),
            }),
            Ok(Err(e)) => Err(InvokeError::Io {
                command: spec.program.clone(),
                reason: e.to_string(),
            }),
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    command = %spec.program,
                    "Agent timed out, killing process"
                );
                // kill() also waits, so the child is reaped before we return.
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed-out agent process");
                }
                Ok(ProcessOutcome::TimedOut {
                    elapsed: started.elapsed(),
                })
            }
        }
    }
}

async fn read_merged<O, E>(stdout: Option<O>, stderr: Option<E>) -> std::io::Result<Vec<u8>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut stdout = stdout;
    let mut stderr = stderr;
    let mut out_buf = vec![0u8; READ_BUF];
    let mut err_buf = vec![0u8; READ_BUF];
    let mut output = Vec::new();

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_some(&mut stdout, &mut out_buf) => match read? {
                0 => stdout = None,
                n => output.extend_from_slice(&out_buf[..n]),
            },
            read = read_some(&mut stderr, &mut err_buf) => match read? {
                0 => stderr = None,
                n => output.extend_from_slice(&err_buf[..n]),
            },
        }
    }

    Ok(output)
}

/// Read from an open stream; a closed one never resolves.
async fn read_some<R: AsyncRead + Unpin>(
    reader: &mut Option<R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match reader {
        Some(r) => r.read(buf).await,
        None => std::future::pending().await,
    }
}
