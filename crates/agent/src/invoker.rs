//! Agent invoker — one external agent run per request, with at most one
//! retry.
//!
//! Flow for [`AgentInvoker::invoke`]:
//!
//! 1. Take the [`RequestGate`] for the whole call (both attempts).
//! 2. Pick a continuation: the newest on-disk session (`--session <id>`),
//!    `--continue`, or nothing, depending on [`ContinuationMode`].
//! 3. Run `<command> <subcommand> --attach <url> [continuation] <prompt>` in
//!    the workdir with a hard timeout. A timeout kills the child and yields a
//!    placeholder with exit code 1; it is never retried.
//! 4. Decode lossily, strip ANSI sequences, trim.
//! 5. A non-zero exit that used a continuation is retried once without it.
//!    The retry's result is final whatever its exit code.
//! 6. Empty final output becomes [`NO_RESPONSE`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clawbridge_config::{AgentConfig, ContinuationMode};
use clawbridge_core::error::InvokeError;
use clawbridge_core::{ProcessOutcome, ProcessRunner, ProcessSpec};
use clawbridge_format::strip_ansi;
use tracing::{info, warn};

use crate::gate::RequestGate;
use crate::session::SessionLocator;

/// Shown when the agent printed nothing.
pub const NO_RESPONSE: &str = "[No response from the agent]";

/// Exit code reported for a timed-out attempt.
pub const TIMEOUT_EXIT_CODE: i32 = 1;

/// How an attempt asks the agent to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// `--session <id>`
    Session(String),
    /// `--continue`
    ContinueLast,
}

impl Continuation {
    fn push_args(&self, spec: ProcessSpec) -> ProcessSpec {
        match self {
            Continuation::Session(id) => spec.arg("--session").arg(id.as_str()),
            Continuation::ContinueLast => spec.arg("--continue"),
        }
    }
}

/// Record of one process execution.
#[derive(Debug, Clone)]
pub struct InvocationAttempt {
    pub prompt: String,
    pub continuation: Option<Continuation>,
    pub exit_code: i32,
    /// Decoded, ANSI-stripped, trimmed output (or the timeout placeholder)
    pub output: String,
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub timed_out: bool,
}

/// The outcome surfaced to the caller: the last attempt's code and output.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub exit_code: i32,
    pub output: String,
    /// One or two attempts, in execution order
    pub attempts: Vec<InvocationAttempt>,
}

impl Invocation {
    pub fn retried(&self) -> bool {
        self.attempts.len() > 1
    }

    pub fn timed_out(&self) -> bool {
        self.attempts.last().is_some_and(|a| a.timed_out)
    }
}

/// Static parameters of the agent command line.
#[derive(Debug, Clone)]
pub struct InvokerSettings {
    pub command: String,
    pub subcommand: String,
    pub attach_url: String,
    pub workdir: PathBuf,
    pub timeout: Duration,
    pub continuation: ContinuationMode,
}

impl From<&AgentConfig> for InvokerSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            command: config.command.clone(),
            subcommand: config.subcommand.clone(),
            attach_url: config.attach_url.clone(),
            workdir: config.workdir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            continuation: config.continuation,
        }
    }
}

/// `[Timeout] The agent did not respond within 5 minutes.`
pub fn timeout_message(timeout: Duration) -> String {
    format!(
        "[Timeout] The agent did not respond within {}.",
        describe_duration(timeout)
    )
}

fn describe_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        0 => format!("{} ms", d.as_millis()),
        s if s % 60 == 0 => {
            let mins = s / 60;
            format!("{mins} minute{}", if mins == 1 { "" } else { "s" })
        }
        s => format!("{s} second{}", if s == 1 { "" } else { "s" }),
    }
}

pub struct AgentInvoker {
    settings: InvokerSettings,
    runner: Arc<dyn ProcessRunner>,
    locator: Option<SessionLocator>,
    gate: RequestGate,
}

impl AgentInvoker {
    pub fn new(settings: InvokerSettings, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            settings,
            runner,
            locator: None,
            gate: RequestGate::new(),
        }
    }

    /// Build from config. The session locator is only wired up for
    /// [`ContinuationMode::LatestSession`].
    pub fn from_config(config: &AgentConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let invoker = Self::new(InvokerSettings::from(config), runner);
        match config.continuation {
            ContinuationMode::LatestSession => invoker.with_session_locator(SessionLocator::new(
                &config.session_dir,
                &config.session_prefix,
            )),
            _ => invoker,
        }
    }

    pub fn with_session_locator(mut self, locator: SessionLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn settings(&self) -> &InvokerSettings {
        &self.settings
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    /// Run the agent for `prompt`. Only a launch or I/O failure is an error;
    /// timeouts and non-zero exits come back as an [`Invocation`].
    pub async fn invoke(&self, prompt: &str) -> Result<Invocation, InvokeError> {
        let _permit = self.gate.acquire().await;

        let continuation = self.pick_continuation().await;
        let first = self.attempt(prompt, continuation).await?;

        let mut attempts = Vec::with_capacity(2);
        let needs_retry = first.exit_code != 0 && first.continuation.is_some() && !first.timed_out;
        attempts.push(first);

        if needs_retry {
            info!(
                exit_code = attempts[0].exit_code,
                "Continuation failed, retrying in a fresh session"
            );
            attempts.push(self.attempt(prompt, None).await?);
        }

        let last = &attempts[attempts.len() - 1];
        let exit_code = last.exit_code;
        let output = if last.output.is_empty() {
            NO_RESPONSE.to_string()
        } else {
            last.output.clone()
        };

        Ok(Invocation {
            exit_code,
            output,
            attempts,
        })
    }

    async fn pick_continuation(&self) -> Option<Continuation> {
        match self.settings.continuation {
            ContinuationMode::Disabled => None,
            ContinuationMode::ContinueLast => Some(Continuation::ContinueLast),
            ContinuationMode::LatestSession => {
                let locator = self.locator.as_ref()?;
                let record = locator.latest().await?;
                info!(session_id = %record.id, "Using session");
                Some(Continuation::Session(record.id))
            }
        }
    }

    fn command_for(&self, prompt: &str, continuation: Option<&Continuation>) -> ProcessSpec {
        let mut spec = ProcessSpec::new(self.settings.command.as_str())
            .arg(self.settings.subcommand.as_str())
            .arg("--attach")
            .arg(self.settings.attach_url.as_str())
            .cwd(&self.settings.workdir);
        if let Some(c) = continuation {
            spec = c.push_args(spec);
        }
        spec.arg(prompt)
    }

    async fn attempt(
        &self,
        prompt: &str,
        continuation: Option<Continuation>,
    ) -> Result<InvocationAttempt, InvokeError> {
        let spec = self.command_for(prompt, continuation.as_ref());
        info!(command = %spec.display(), "Running agent");

        let started_at = Utc::now();
        let outcome = self.runner.run(&spec, self.settings.timeout).await?;

        let attempt = match outcome {
            ProcessOutcome::Exited {
                code,
                output,
                elapsed,
            } => {
                let text = strip_ansi(&String::from_utf8_lossy(&output))
                    .trim()
                    .to_string();
                info!(
                    exit_code = code,
                    output_chars = text.chars().count(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Agent exited"
                );
                InvocationAttempt {
                    prompt: prompt.to_string(),
                    continuation,
                    exit_code: code,
                    output: text,
                    elapsed,
                    started_at,
                    timed_out: false,
                }
            }
            ProcessOutcome::TimedOut { elapsed } => {
                warn!(
                    timeout_secs = self.settings.timeout.as_secs(),
                    "Agent timed out"
                );
                InvocationAttempt {
                    prompt: prompt.to_string(),
                    continuation,
                    exit_code: TIMEOUT_EXIT_CODE,
                    output: timeout_message(self.settings.timeout),
                    elapsed,
                    started_at,
                    timed_out: true,
                }
            }
        };

        Ok(attempt)
    }
}
