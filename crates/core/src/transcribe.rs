//! Transcriber trait — voice-to-text capability.

use async_trait::async_trait;

use crate::error::TranscribeError;

/// Turns recorded audio into a text prompt.
///
/// Implementations that do CPU-heavy work must move it off the async
/// scheduler so typing pings and other requests keep flowing.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Short name for logs (e.g., "command").
    fn name(&self) -> &str;

    /// Transcribe the given audio bytes (OGG/Opus voice notes on Telegram).
    async fn transcribe(&self, audio: Vec<u8>) -> std::result::Result<String, TranscribeError>;
}
