//! `clawbridge chat` — Talk to the agent from the terminal.
//!
//! Uses the same pipeline as `serve`. The terminal user is trusted, so the
//! allow-list is just the configured `cli.sender_id`.

use std::path::Path;
use std::sync::Arc;

use clawbridge_agent::{Bridge, TokioProcessRunner};
use clawbridge_channels::CliChannel;
use clawbridge_security::AllowList;

use super::load_config;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let sender_id = config.cli.sender_id;

    let channel = Arc::new(CliChannel::new(sender_id));
    let bridge = Bridge::from_config(&config, channel, Arc::new(TokioProcessRunner::new()))
        .with_allowlist(AllowList::new([sender_id]));

    println!("🦀 clawbridge chat — agent: {}", config.agent.command);
    println!("   Type a prompt and press Enter. `exit` or Ctrl+D to quit.\n");

    Arc::new(bridge).run().await?;
    Ok(())
}
