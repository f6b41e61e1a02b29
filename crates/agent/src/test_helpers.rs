//! Shared test helpers for the relay pipeline.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use clawbridge_core::error::InvokeError;
use clawbridge_core::{ProcessOutcome, ProcessRunner, ProcessSpec};

/// A process runner that returns scripted outcomes in sequence and records
/// every spec it was asked to run.
///
/// Panics if more runs are requested than outcomes provided.
pub struct ScriptedRunner {
    outcomes: Mutex<VecDeque<Result<ProcessOutcome, InvokeError>>>,
    calls: Mutex<Vec<ProcessSpec>>,
    delay: Duration,
}

impl ScriptedRunner {
    pub fn new(outcomes: Vec<ProcessOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().map(Ok).collect()),
            calls: Mutex::new(vec![]),
            delay: Duration::ZERO,
        }
    }

    /// Every run fails to launch.
    pub fn failing_launch() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::from([Err(InvokeError::Launch {
                command: "opencode".into(),
                reason: "No such file or directory (os error 2)".into(),
            })])),
            calls: Mutex::new(vec![]),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long inside every run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        spec: &ProcessSpec,
        _timeout: Duration,
    ) -> Result<ProcessOutcome, InvokeError> {
        self.calls.lock().unwrap().push(spec.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedRunner: no outcome for `{}`", spec.display()))
    }
}

pub fn exited(code: i32, output: &str) -> ProcessOutcome {
    ProcessOutcome::Exited {
        code,
        output: output.as_bytes().to_vec(),
        elapsed: Duration::from_millis(10),
    }
}
