//! `clawbridge serve` — Relay Telegram messages to the agent.

use std::path::Path;
use std::sync::Arc;

use clawbridge_agent::{Bridge, TokioProcessRunner};
use clawbridge_channels::TelegramChannel;
use clawbridge_config::AppConfig;
use clawbridge_core::Channel;
use clawbridge_core::error::ChannelError;
use tracing::{info, warn};

use super::load_config;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;

    let token = match bot_token(&config) {
        Ok(token) => token,
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: No Telegram bot token configured!");
            eprintln!();
            eprintln!("  Set the environment variable:");
            eprintln!("    TELEGRAM_BOT_TOKEN=123456:ABC-...");
            eprintln!();
            eprintln!("  Or add it to the [telegram] section of your config file.");
            eprintln!();
            return Err(e.into());
        }
    };

    if config.telegram.allowed_users.is_empty() {
        warn!("TELEGRAM_ALLOWED_USERS is empty: every sender will be refused");
    }

    let channel = Arc::new(TelegramChannel::new(token));
    let bridge = Arc::new(Bridge::from_config(
        &config,
        channel.clone(),
        Arc::new(TokioProcessRunner::new()),
    ));

    info!(
        agent = %config.agent.command,
        workdir = %config.agent.workdir.display(),
        continuation = ?config.agent.continuation,
        style = ?config.render.style,
        "Starting Telegram bridge"
    );

    bridge.run().await?;
    channel.stop().await?;
    Ok(())
}

/// The configured bot token, if any.
pub(crate) fn bot_token(config: &AppConfig) -> Result<&str, ChannelError> {
    config
        .telegram
        .bot_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ChannelError::NotConfigured("telegram: no bot token".into()))
}
