//! Error types for the clawbridge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all clawbridge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Agent invocation errors ---
    #[error("Agent error: {0}")]
    Invoke(#[from] InvokeError),

    // --- Transcription errors ---
    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("File download failed on {channel}: {reason}")]
    DownloadFailed { channel: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Failures of the external agent process that cannot be turned into an
/// exit code. A non-zero exit or a timeout is *not* an error.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Failed to launch `{command}`: {reason}")]
    Launch { command: String, reason: String },

    #[error("I/O error while running `{command}`: {reason}")]
    Io { command: String, reason: String },
}

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Transcription is not configured")]
    NotConfigured,

    #[error("Transcription command failed: {0}")]
    Failed(String),

    #[error("Transcription produced no text")]
    Empty,
}
