//! External process capability.
//!
//! The agent is a black-box command: arguments and a working directory go in,
//! a combined stdout/stderr blob and an exit code come out, bounded by a
//! wall-clock limit. Runners must kill and reap the child when the limit is hit.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InvokeError;

/// What to launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Executable name or path
    pub program: String,

    /// Arguments, in order
    pub args: Vec<String>,

    /// Working directory for the child
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// The full command line, for logging.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a bounded process run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The child exited on its own.
    Exited {
        /// Exit code; `-1` when the child was terminated by a signal
        code: i32,
        /// Raw combined stdout + stderr
        output: Vec<u8>,
        elapsed: Duration,
    },
    /// The wall-clock limit elapsed; the child has been killed and reaped.
    TimedOut { elapsed: Duration },
}

/// Runs an external process to completion or until the deadline.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Launch `spec`, capture stdout and stderr into one stream, and wait at
    /// most `timeout`. A launch failure is an error; non-zero exits and
    /// timeouts are outcomes.
    async fn run(
        &self,
        spec: &ProcessSpec,
        timeout: Duration,
    ) -> std::result::Result<ProcessOutcome, InvokeError>;
}
