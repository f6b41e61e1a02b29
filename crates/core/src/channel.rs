//! Channel trait — the abstraction over chat transports.
//!
//! A Channel connects clawbridge to a messaging platform (Telegram, or the
//! local terminal). It receives messages from users and sends the agent's
//! formatted replies back, one call per chunk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The channel this message belongs to
    pub channel_id: ChannelId,

    /// Numeric platform user ID, checked against the allow-list
    pub sender_id: i64,

    /// Human-readable sender name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// The text content (empty for pure voice messages)
    #[serde(default)]
    pub content: String,

    /// The chat/group/DM identifier within the channel
    pub chat_id: String,

    /// Attachments (voice notes, documents, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Platform-specific metadata
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ChannelMessage {
    /// A plain text message.
    pub fn text(
        channel_id: ChannelId,
        sender_id: i64,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel_id,
            sender_id,
            sender_name: None,
            content: content.into(),
            chat_id: chat_id.into(),
            attachments: vec![],
            metadata: serde_json::Map::new(),
        }
    }

    /// The first voice attachment, if any.
    pub fn voice(&self) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.kind == AttachmentKind::Voice)
    }

    /// The bot command name (without the leading slash or `@botname`
    /// suffix) when the message is a command.
    pub fn command(&self) -> Option<&str> {
        let first = self.content.trim_start().split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        if name.is_empty() { None } else { Some(name) }
    }
}

/// An attachment in a channel message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Type of attachment
    pub kind: AttachmentKind,

    /// Platform file handle used to download the content
    pub file_id: String,

    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// Playback length for audio/voice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Voice,
    Audio,
    Document,
    Other,
}

/// The core Channel trait.
///
/// Implementations handle platform-specific connection logic and message
/// delivery. Authorization is not a channel concern; the relay checks the
/// allow-list before anything is forwarded to the agent.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "telegram", "cli").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Start listening for incoming messages.
    ///
    /// Returns a receiver that yields incoming messages. The channel
    /// implementation handles polling internally.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Send a plain text message to a chat.
    async fn send(&self, chat_id: &str, text: &str) -> std::result::Result<(), ChannelError>;

    /// Send a message rendered with the platform's markup (MarkdownV2 on
    /// Telegram). Falls back to plain delivery by default.
    async fn send_formatted(
        &self,
        chat_id: &str,
        markup: &str,
    ) -> std::result::Result<(), ChannelError> {
        self.send(chat_id, markup).await
    }

    /// Send a typing indicator (if the platform supports it).
    async fn send_typing(&self, _chat_id: &str) -> std::result::Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// Download the raw bytes behind an attachment.
    async fn download(&self, attachment: &Attachment) -> std::result::Result<Vec<u8>, ChannelError> {
        Err(ChannelError::DownloadFailed {
            channel: self.name().to_string(),
            reason: format!("downloads not supported (file {})", attachment.file_id),
        })
    }

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Health check — is the channel connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str) -> ChannelMessage {
        ChannelMessage::text(ChannelId("telegram".into()), 12345, "67890", content)
    }

    #[test]
    fn channel_message_creation() {
        let msg = message("Hello bot!");
        assert_eq!(msg.channel_id.0, "telegram");
        assert_eq!(msg.sender_id, 12345);
        assert_eq!(msg.content, "Hello bot!");
        assert!(msg.voice().is_none());
    }

    #[test]
    fn command_parsing() {
        assert_eq!(message("/start").command(), Some("start"));
        assert_eq!(message("/help@freeflix_bot extra").command(), Some("help"));
        assert_eq!(message("find me a movie").command(), None);
        assert_eq!(message("/").command(), None);
        assert_eq!(message("").command(), None);
    }

    #[test]
    fn voice_attachment_lookup() {
        let mut msg = message("");
        msg.attachments.push(Attachment {
            kind: AttachmentKind::Document,
            file_id: "doc".into(),
            mime_type: None,
            size_bytes: None,
            duration_secs: None,
        });
        msg.attachments.push(Attachment {
            kind: AttachmentKind::Voice,
            file_id: "voice-1".into(),
            mime_type: Some("audio/ogg".into()),
            size_bytes: Some(2048),
            duration_secs: Some(3),
        });
        assert_eq!(msg.voice().map(|a| a.file_id.as_str()), Some("voice-1"));
    }

    #[test]
    fn attachment_serialization() {
        let attachment = Attachment {
            kind: AttachmentKind::Voice,
            file_id: "AwACAgIAAxkBAAI".into(),
            mime_type: Some("audio/ogg".into()),
            size_bytes: Some(102400),
            duration_secs: None,
        };
        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("voice"));
        assert!(!json.contains("duration_secs"));
    }
}
