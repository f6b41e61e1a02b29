//! `clawbridge doctor` — Diagnose configuration and environment.

use std::path::Path;

use clawbridge_channels::TelegramChannel;
use clawbridge_config::{AppConfig, ContinuationMode};
use clawbridge_core::Channel;

use super::resolve_config_path;
use super::serve::bot_token;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 clawbridge Doctor — System Diagnostics");
    println!("=========================================\n");

    let mut issues = 0;

    // Check config
    let path = resolve_config_path(config_path);
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file — using defaults (run `clawbridge init`)");
    }

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config and re-run.");
            return Ok(());
        }
    };

    match bot_token(&config) {
        Ok(token) => {
            println!("  ✅ Telegram bot token configured");
            if !check_reachable(&TelegramChannel::new(token)).await {
                issues += 1;
            }
        }
        Err(_) => {
            println!("  ❌ No bot token — set TELEGRAM_BOT_TOKEN");
            issues += 1;
        }
    }

    if config.telegram.allowed_users.is_empty() {
        println!("  ❌ Allow-list empty — every sender will be refused (set TELEGRAM_ALLOWED_USERS)");
        issues += 1;
    } else {
        println!("  ✅ {} allowed user(s)", config.telegram.allowed_users.len());
    }

    // Check agent
    match which::which(&config.agent.command) {
        Ok(found) => println!("  ✅ Agent command found: {}", found.display()),
        Err(_) => {
            println!("  ❌ Agent command `{}` not found on PATH", config.agent.command);
            issues += 1;
        }
    }

    if config.agent.workdir.is_dir() {
        println!("  ✅ Workdir exists: {}", config.agent.workdir.display());
    } else {
        println!("  ❌ Workdir missing: {}", config.agent.workdir.display());
        issues += 1;
    }

    if config.agent.continuation == ContinuationMode::LatestSession {
        if config.agent.session_dir.is_dir() {
            println!("  ✅ Session store: {}", config.agent.session_dir.display());
        } else {
            println!(
                "  ⚠️  Session store not found: {} (every request starts a new session)",
                config.agent.session_dir.display()
            );
            issues += 1;
        }
    }

    // Check transcription
    match config.transcription.command.as_deref() {
        Some(cmd) if which::which(cmd).is_ok() => println!("  ✅ Transcriber found: {cmd}"),
        Some(cmd) => {
            println!("  ❌ Transcriber `{cmd}` not found on PATH");
            issues += 1;
        }
        None => println!("  ⚠️  No transcriber — voice messages will be refused"),
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Ask the channel whether it can reach its service. Prints the result.
async fn check_reachable(channel: &dyn Channel) -> bool {
    match channel.health_check().await {
        Ok(true) => {
            println!("  ✅ {} reachable", channel.name());
            true
        }
        Ok(false) => {
            println!("  ❌ {} not operational", channel.name());
            false
        }
        Err(e) => {
            println!("  ❌ {} unreachable: {e}", channel.name());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clawbridge_core::ChannelId;
    use clawbridge_core::error::ChannelError;

    struct StubChannel {
        id: ChannelId,
        healthy: Result<bool, ()>,
    }

    impl StubChannel {
        fn new(healthy: Result<bool, ()>) -> Self {
            Self {
                id: ChannelId("stub".into()),
                healthy,
            }
        }
    }

    #[async_trait]
    impl Channel for StubChannel {
        fn name(&self) -> &str {
            "stub"
        }

        fn id(&self) -> &ChannelId {
            &self.id
        }

        async fn start(
            &self,
        ) -> Result<
            tokio::sync::mpsc::Receiver<Result<clawbridge_core::ChannelMessage, ChannelError>>,
            ChannelError,
        > {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(rx)
        }

        async fn send(&self, _chat_id: &str, _text: &str) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<bool, ChannelError> {
            self.healthy
                .map_err(|_| ChannelError::ConnectionLost("401 Unauthorized".into()))
        }
    }

    #[tokio::test]
    async fn healthy_channel_passes() {
        assert!(check_reachable(&StubChannel::new(Ok(true))).await);
    }

    #[tokio::test]
    async fn unreachable_or_unhealthy_channel_is_an_issue() {
        assert!(!check_reachable(&StubChannel::new(Err(()))).await);
        assert!(!check_reachable(&StubChannel::new(Ok(false))).await);
    }
}
