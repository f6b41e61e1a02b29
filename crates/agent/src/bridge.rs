//! The relay pipeline: one chat message in, one or more formatted replies
//! out.
//!
//! ```text
//! message ─▶ allow-list ─▶ (/start|/help) ─▶ (voice → transcript)
//!         ─▶ AgentInvoker (gate, activity ping) ─▶ Renderer ─▶ split_message ─▶ send
//! ```
//!
//! Every failure ends as a text reply; nothing here takes the serving loop
//! down.

use std::sync::Arc;
use std::time::Duration;

use clawbridge_config::AppConfig;
use clawbridge_core::error::{ChannelError, InvokeError, TranscribeError};
use clawbridge_core::{Attachment, Channel, ChannelMessage, ProcessRunner, Transcriber};
use clawbridge_format::markdown::escape;
use clawbridge_format::{Renderer, split_message, unescape_markup};
use clawbridge_security::{AllowList, SenderCheckResult};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::invoker::{AgentInvoker, NO_RESPONSE};
use crate::transcribe::CommandTranscriber;

pub const HELP_TEXT: &str = "clawbridge is ready! Send me a message and I'll forward it to the AI agent.\n\n\
Examples:\n\
  \"What changed in the repo since yesterday?\"\n\
  \"Run the tests and summarize the failures\"\n\
  \"Draft a reply to the open issue about timeouts\"\n\n\
Voice messages work too: they are transcribed and sent as the prompt.";

pub const TRANSCRIPTION_FAILED: &str = "[Could not transcribe voice message]";

pub fn unauthorized_reply(user_id: i64) -> String {
    format!(
        "Unauthorized. Your user ID is: {user_id}\nAdd it to TELEGRAM_ALLOWED_USERS to gain access."
    )
}

pub fn launch_failed_reply(err: &InvokeError) -> String {
    let reason = match err {
        InvokeError::Launch { reason, .. } | InvokeError::Io { reason, .. } => reason,
    };
    format!("[Error] Could not start the agent: {reason}")
}

fn log_task_failure(done: Result<(), JoinError>) {
    if let Err(e) = done {
        error!(error = %e, "Request task failed");
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Denied,
    Help,
    /// Nothing to forward (empty text, unsupported message).
    Ignored,
    TranscriptionFailed,
    LaunchFailed,
    Answered { exit_code: i32, chunks: usize },
}

/// Sends typing indicators until stopped. Dropping it aborts the loop.
struct ActivityPing {
    handle: JoinHandle<()>,
}

impl ActivityPing {
    fn start(channel: Arc<dyn Channel>, chat_id: String, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                if let Err(e) = channel.send_typing(&chat_id).await {
                    debug!(error = %e, "Typing indicator failed");
                }
                tokio::time::sleep(interval).await;
            }
        });
        Self { handle }
    }

    /// Cancel the loop and wait until it has actually stopped.
    async fn stop(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for ActivityPing {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct Bridge {
    channel: Arc<dyn Channel>,
    allowlist: AllowList,
    invoker: Arc<AgentInvoker>,
    transcriber: Option<Arc<dyn Transcriber>>,
    renderer: Renderer,
    max_message_len: usize,
    typing_interval: Duration,
}

impl Bridge {
    pub fn new(channel: Arc<dyn Channel>, allowlist: AllowList, invoker: Arc<AgentInvoker>) -> Self {
        Self {
            channel,
            allowlist,
            invoker,
            transcriber: None,
            renderer: Renderer::default(),
            max_message_len: 4096,
            typing_interval: Duration::from_secs(4),
        }
    }

    /// Wire everything from configuration.
    pub fn from_config(
        config: &AppConfig,
        channel: Arc<dyn Channel>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let invoker = Arc::new(AgentInvoker::from_config(&config.agent, runner));
        let mut bridge = Self::new(channel, AllowList::from_config(&config.telegram), invoker)
            .with_renderer(Renderer::new(config.render.style))
            .with_max_message_len(config.render.max_message_len)
            .with_typing_interval(Duration::from_secs(config.render.typing_interval_secs));

        if let Some(t) = CommandTranscriber::from_config(&config.transcription) {
            bridge = bridge.with_transcriber(Arc::new(t));
        }
        bridge
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_allowlist(mut self, allowlist: AllowList) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_max_message_len(mut self, max_len: usize) -> Self {
        self.max_message_len = max_len.max(1);
        self
    }

    pub fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    pub fn invoker(&self) -> &Arc<AgentInvoker> {
        &self.invoker
    }

    /// Serve until the channel's message stream ends. Each message runs in
    /// its own task; in-flight requests are finished before returning.
    pub async fn run(self: Arc<Self>) -> Result<(), ChannelError> {
        let mut inbound = self.channel.start().await?;
        info!(channel = %self.channel.name(), users = self.allowlist.len(), "Bridge started");

        let mut tasks = JoinSet::new();
        while let Some(next) = inbound.recv().await {
            while let Some(done) = tasks.try_join_next() {
                log_task_failure(done);
            }

            match next {
                Ok(msg) => {
                    let this = self.clone();
                    tasks.spawn(async move {
                        this.handle(msg).await;
                    });
                }
                Err(e) => warn!(error = %e, "Channel delivered an error"),
            }
        }

        while let Some(done) = tasks.join_next().await {
            log_task_failure(done);
        }
        info!(channel = %self.channel.name(), "Bridge stopped");
        Ok(())
    }

    /// Process one message inside its own `request` span.
    pub async fn handle(&self, msg: ChannelMessage) -> Handled {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("request", %request_id, user_id = msg.sender_id);
        let handled = self.handle_inner(msg).instrument(span.clone()).await;
        span.in_scope(|| debug!(?handled, "Request finished"));
        handled
    }

    async fn handle_inner(&self, msg: ChannelMessage) -> Handled {
        let chat_id = msg.chat_id.as_str();

        if let SenderCheckResult::Denied { sender_id, reason } =
            self.allowlist.check_sender(msg.sender_id)
        {
            info!(sender_id, %reason, "Unauthorized sender");
            self.reply(chat_id, &unauthorized_reply(sender_id)).await;
            return Handled::Denied;
        }

        match msg.command() {
            Some("start" | "help") => {
                self.reply(chat_id, HELP_TEXT).await;
                return Handled::Help;
            }
            Some(other) if msg.voice().is_none() => {
                debug!(command = other, "Ignoring unknown command");
                return Handled::Ignored;
            }
            _ => {}
        }

        let prompt = match msg.voice() {
            Some(voice) => match self.transcribe_voice(chat_id, voice).await {
                Ok(text) => {
                    self.reply(chat_id, &format!("🎤 {text}")).await;
                    text
                }
                Err(e) => {
                    error!(error = %e, "Voice transcription failed");
                    self.reply(chat_id, TRANSCRIPTION_FAILED).await;
                    return Handled::TranscriptionFailed;
                }
            },
            None => msg.content.trim().to_string(),
        };

        if prompt.is_empty() {
            debug!("Nothing to forward");
            return Handled::Ignored;
        }

        info!(prompt_chars = prompt.chars().count(), "Forwarding to agent");
        let ping = ActivityPing::start(
            self.channel.clone(),
            chat_id.to_string(),
            self.typing_interval,
        );
        let result = self.invoker.invoke(&prompt).await;
        ping.stop().await;

        match result {
            Ok(invocation) => {
                let chunks = self.deliver(chat_id, &invocation.output).await;
                Handled::Answered {
                    exit_code: invocation.exit_code,
                    chunks,
                }
            }
            Err(e) => {
                error!(error = %e, "Agent could not be started");
                self.reply(chat_id, &launch_failed_reply(&e)).await;
                Handled::LaunchFailed
            }
        }
    }

    async fn transcribe_voice(
        &self,
        chat_id: &str,
        voice: &Attachment,
    ) -> Result<String, clawbridge_core::Error> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or(TranscribeError::NotConfigured)?;

        if let Err(e) = self.channel.send_typing(chat_id).await {
            debug!(error = %e, "Typing indicator failed");
        }
        let audio = self.channel.download(voice).await?;
        debug!(bytes = audio.len(), transcriber = transcriber.name(), "Voice downloaded");
        Ok(transcriber.transcribe(audio).await?)
    }

    /// Render agent output and send it chunk by chunk. Returns the number of
    /// chunks.
    async fn deliver(&self, chat_id: &str, output: &str) -> usize {
        let mut markup = self.renderer.render(output);
        if markup.trim().is_empty() {
            markup = escape(NO_RESPONSE);
        }

        let chunks = split_message(&markup, self.max_message_len);
        info!(chunks = chunks.len(), chars = markup.chars().count(), "Sending reply");

        for chunk in &chunks {
            if let Err(e) = self.channel.send_formatted(chat_id, chunk).await {
                warn!(error = %e, "Formatted send rejected, resending as plain text");
                if let Err(e) = self.channel.send(chat_id, &unescape_markup(chunk)).await {
                    warn!(error = %e, "Failed to deliver reply chunk");
                }
            }
        }
        chunks.len()
    }

    async fn reply(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.channel.send(chat_id, text).await {
            warn!(error = %e, "Failed to send reply");
        }
    }
}
