//! Telegram channel adapter.
//!
//! Long-polls the Bot API through `teloxide`. Incoming text and voice
//! messages are converted to [`ChannelMessage`]s and forwarded over an mpsc
//! queue; replies go out with `sendMessage` (MarkdownV2 for formatted
//! replies), typing indicators with `sendChatAction`, and voice notes are
//! fetched with `getFile` + download.

use async_trait::async_trait;
use clawbridge_core::channel::{Attachment, AttachmentKind, Channel, ChannelId, ChannelMessage};
use clawbridge_core::error::ChannelError;
use teloxide::dispatching::ShutdownToken;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

type Inbound = mpsc::Sender<Result<ChannelMessage, ChannelError>>;

/// Telegram channel adapter.
pub struct TelegramChannel {
    bot: Bot,
    channel_id: ChannelId,
    shutdown: Mutex<Option<ShutdownToken>>,
}

impl TelegramChannel {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot: Bot::new(bot_token),
            channel_id: ChannelId("telegram".into()),
            shutdown: Mutex::new(None),
        }
    }

    fn delivery_error(&self, reason: impl std::fmt::Display) -> ChannelError {
        ChannelError::DeliveryFailed {
            channel: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

fn parse_chat_id(chat_id: &str) -> Result<ChatId, ChannelError> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| ChannelError::InvalidPayload(format!("not a Telegram chat id: {chat_id}")))
}

/// Convert a Telegram message. Messages without a sender, or with neither
/// text nor voice, are skipped.
fn to_channel_message(msg: &Message) -> Option<ChannelMessage> {
    let user = msg.from.as_ref()?;
    let content = msg.text().or(msg.caption()).unwrap_or_default();

    let mut attachments = vec![];
    if let Some(voice) = msg.voice() {
        attachments.push(Attachment {
            kind: AttachmentKind::Voice,
            file_id: voice.file.id.clone(),
            mime_type: voice.mime_type.as_ref().map(|m| m.to_string()),
            size_bytes: Some(u64::from(voice.file.size)),
            duration_secs: None,
        });
    }

    if content.trim().is_empty() && attachments.is_empty() {
        return None;
    }

    let mut converted = ChannelMessage::text(
        ChannelId("telegram".into()),
        user.id.0 as i64,
        msg.chat.id.0.to_string(),
        content,
    );
    converted.sender_name = Some(
        user.username
            .clone()
            .unwrap_or_else(|| user.first_name.clone()),
    );
    converted.attachments = attachments;
    converted
        .metadata
        .insert("message_id".into(), msg.id.0.into());
    Some(converted)
}

async fn forward_message(msg: Message, tx: Inbound) -> ResponseResult<()> {
    match to_channel_message(&msg) {
        Some(converted) => {
            debug!(
                user_id = converted.sender_id,
                chat_id = %converted.chat_id,
                voice = converted.voice().is_some(),
                "Telegram message received"
            );
            if tx.send(Ok(converted)).await.is_err() {
                debug!("Inbound queue closed, dropping Telegram message");
            }
        }
        None => debug!(chat_id = msg.chat.id.0, "Ignoring unsupported Telegram message"),
    }
    Ok(())
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        // Messages that queued up while the bridge was down are discarded.
        self.bot
            .delete_webhook()
            .drop_pending_updates(true)
            .await
            .map_err(|e| ChannelError::ConnectionLost(format!("deleteWebhook: {e}")))?;

        let (tx, rx) = mpsc::channel(64);
        let handler = Update::filter_message().endpoint(forward_message);
        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![tx])
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build();
        *self.shutdown.lock().await = Some(dispatcher.shutdown_token());

        tokio::spawn(async move {
            dispatcher.dispatch().await;
            info!("Telegram polling stopped");
        });

        info!("Telegram channel started (long polling)");
        Ok(rx)
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let chat = parse_chat_id(chat_id)?;
        self.bot
            .send_message(chat, text)
            .await
            .map(|_| ())
            .map_err(|e| self.delivery_error(e))
    }

    async fn send_formatted(&self, chat_id: &str, markup: &str) -> Result<(), ChannelError> {
        let chat = parse_chat_id(chat_id)?;
        self.bot
            .send_message(chat, markup)
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map(|_| ())
            .map_err(|e| self.delivery_error(e))
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), ChannelError> {
        let chat = parse_chat_id(chat_id)?;
        self.bot
            .send_chat_action(chat, ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(|e| self.delivery_error(e))
    }

    async fn download(&self, attachment: &Attachment) -> Result<Vec<u8>, ChannelError> {
        let download_error = |reason: String| ChannelError::DownloadFailed {
            channel: "telegram".into(),
            reason,
        };

        let file = self
            .bot
            .get_file(attachment.file_id.clone())
            .await
            .map_err(|e| download_error(format!("getFile: {e}")))?;

        let mut buf = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(|e| download_error(e.to_string()))?;
        Ok(buf)
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Telegram channel stopping");
        if let Some(token) = self.shutdown.lock().await.take() {
            match token.shutdown() {
                Ok(done) => done.await,
                Err(e) => warn!(error = %e, "Telegram dispatcher was not running"),
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        self.bot
            .get_me()
            .await
            .map(|me| {
                debug!(username = ?me.username, "Telegram bot reachable");
                true
            })
            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_and_id() {
        let ch = TelegramChannel::new("123:test-token");
        assert_eq!(ch.name(), "telegram");
        assert_eq!(ch.id().0, "telegram");
    }

    #[test]
    fn chat_ids_must_be_numeric() {
        assert_eq!(parse_chat_id("-100123").unwrap(), ChatId(-100123));
        assert!(matches!(
            parse_chat_id("cli"),
            Err(ChannelError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn send_rejects_bad_chat_id_before_network() {
        let ch = TelegramChannel::new("123:test-token");
        assert!(matches!(
            ch.send("not-a-chat", "hi").await,
            Err(ChannelError::InvalidPayload(_))
        ));
        assert!(matches!(
            ch.send_typing("nope").await,
            Err(ChannelError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn stop_without_start_is_ok() {
        let ch = TelegramChannel::new("123:test-token");
        assert!(ch.stop().await.is_ok());
    }
}
