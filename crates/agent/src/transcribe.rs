//! Voice transcription through an external command.
//!
//! The audio is written to a scratch file and the configured command is run
//! with `{input}` in its arguments replaced by that file's path. Whatever the
//! command prints on stdout is the transcript. Speech recognizers are CPU
//! heavy, so the run happens on tokio's blocking pool.

use std::io::Write;
use std::process::Command;

use async_trait::async_trait;
use clawbridge_config::TranscriptionConfig;
use clawbridge_core::Transcriber;
use clawbridge_core::error::TranscribeError;
use tracing::{debug, info};

/// Placeholder in `args` for the audio file path.
pub const INPUT_PLACEHOLDER: &str = "{input}";

#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `None` when no command is configured.
    pub fn from_config(config: &TranscriptionConfig) -> Option<Self> {
        config
            .command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| Self::new(c, config.args.clone()))
    }

    fn args_for(&self, input: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(INPUT_PLACEHOLDER, input))
            .collect();
        if !self.args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
            args.push(input.to_string());
        }
        args
    }

    fn run_blocking(&self, audio: &[u8]) -> Result<String, TranscribeError> {
        let mut file = tempfile::Builder::new()
            .prefix("clawbridge-voice-")
            .suffix(".ogg")
            .tempfile()
            .map_err(|e| TranscribeError::Failed(format!("scratch file: {e}")))?;
        file.write_all(audio)
            .and_then(|_| file.flush())
            .map_err(|e| TranscribeError::Failed(format!("scratch file: {e}")))?;

        let input = file.path().to_string_lossy().into_owned();
        let args = self.args_for(&input);
        debug!(command = %self.program, ?args, "Running transcriber");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| TranscribeError::Failed(format!("`{}`: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::Failed(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(TranscribeError::Empty);
        }
        Ok(text)
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    fn name(&self) -> &str {
        "command"
    }

    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, TranscribeError> {
        let size = audio.len();
        let this = self.clone();
        let text = tokio::task::spawn_blocking(move || this.run_blocking(&audio))
            .await
            .map_err(|e| TranscribeError::Failed(format!("transcriber task: {e}")))??;
        info!(audio_bytes = size, chars = text.chars().count(), "Voice transcribed");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_command() {
        assert!(CommandTranscriber::from_config(&TranscriptionConfig::default()).is_none());

        let config = TranscriptionConfig {
            command: Some("  ".into()),
            args: vec![],
        };
        assert!(CommandTranscriber::from_config(&config).is_none());

        let config = TranscriptionConfig {
            command: Some("whisper-cli".into()),
            args: vec!["-f".into(), "{input}".into()],
        };
        assert!(CommandTranscriber::from_config(&config).is_some());
    }

    #[test]
    fn input_placeholder_substitution() {
        let t = CommandTranscriber::new("whisper", vec!["-f".into(), "{input}".into(), "-nt".into()]);
        assert_eq!(t.args_for("/tmp/a.ogg"), vec!["-f", "/tmp/a.ogg", "-nt"]);

        let t = CommandTranscriber::new("transcribe", vec!["--lang".into(), "en".into()]);
        assert_eq!(t.args_for("/tmp/a.ogg"), vec!["--lang", "en", "/tmp/a.ogg"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_becomes_transcript() {
        // `cat` echoes the audio file, standing in for a recognizer.
        let t = CommandTranscriber::new("cat", vec!["{input}".into()]);
        let text = t.transcribe(b"  find me a movie \n".to_vec()).await.unwrap();
        assert_eq!(text, "find me a movie");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_transcript_is_an_error() {
        let t = CommandTranscriber::new("cat", vec!["{input}".into()]);
        let err = t.transcribe(b"\n\n".to_vec()).await.unwrap_err();
        assert!(matches!(err, TranscribeError::Empty));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_an_error() {
        let t = CommandTranscriber::new("sh", vec!["-c".into(), "echo boom >&2; exit 2".into()]);
        let err = t.transcribe(vec![1, 2, 3]).await.unwrap_err();
        match err {
            TranscribeError::Failed(reason) => assert!(reason.contains("boom")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_command_is_an_error() {
        let t = CommandTranscriber::new("clawbridge-no-such-recognizer", vec![]);
        assert!(matches!(
            t.transcribe(vec![0]).await,
            Err(TranscribeError::Failed(_))
        ));
    }
}
