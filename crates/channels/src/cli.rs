//! CLI channel — interactive terminal-based chat.
//!
//! Reads prompts from stdin (one per line), writes replies to stdout.
//! Used by `clawbridge chat` to drive the same pipeline as Telegram
//! without a bot token.

use async_trait::async_trait;
use clawbridge_core::channel::{Channel, ChannelId, ChannelMessage};
use clawbridge_core::error::ChannelError;
use clawbridge_format::unescape_markup;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, mpsc};

pub const CLI_CHAT_ID: &str = "cli";

type Input = Box<dyn AsyncBufRead + Send + Unpin>;

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
    sender_id: i64,
    input: Mutex<Option<Input>>,
}

impl CliChannel {
    /// Messages are reported as coming from `sender_id`, which must be on
    /// the allow-list like any other user.
    pub fn new(sender_id: i64) -> Self {
        Self {
            id: ChannelId("cli".into()),
            sender_id,
            input: Mutex::new(None),
        }
    }

    /// Read from `input` instead of stdin.
    pub fn with_input(self, input: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            input: Mutex::new(Some(Box::new(input))),
            ..self
        }
    }

    pub fn sender_id(&self) -> i64 {
        self.sender_id
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();
        let sender_id = self.sender_id;
        let input: Input = self
            .input
            .lock()
            .await
            .take()
            .unwrap_or_else(|| Box::new(BufReader::new(io::stdin())));

        tokio::spawn(async move {
            let mut lines = input.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }

                        // Check for exit commands
                        if matches!(
                            line.as_str(),
                            "exit" | "quit" | "/exit" | "/quit" | ":q"
                        ) {
                            break;
                        }

                        let mut msg =
                            ChannelMessage::text(channel_id.clone(), sender_id, CLI_CHAT_ID, line);
                        msg.sender_name = Some("User".into());

                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, _chat_id: &str, text: &str) -> Result<(), ChannelError> {
        println!("{text}\n");
        Ok(())
    }

    async fn send_formatted(&self, chat_id: &str, markup: &str) -> Result<(), ChannelError> {
        self.send(chat_id, &unescape_markup(markup)).await
    }
}
