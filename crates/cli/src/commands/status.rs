//! `clawbridge status` — Show effective configuration.

use std::path::Path;

use super::{load_config, resolve_config_path};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let path = resolve_config_path(config_path);

    println!("🦀 clawbridge Status");
    println!("====================");
    println!("  Config file:   {}", path.display());
    println!("  Bot token:     {}", if config.has_bot_token() { "[set]" } else { "[missing]" });
    println!("  Allowed users: {}", config.telegram.allowed_users.len());
    println!("  Agent:         {} {}", config.agent.command, config.agent.subcommand);
    println!("  Attach URL:    {}", config.agent.attach_url);
    println!("  Workdir:       {}", config.agent.workdir.display());
    println!("  Timeout:       {}s", config.agent.timeout_secs);
    println!("  Continuation:  {:?}", config.agent.continuation);
    println!("  Session dir:   {}", config.agent.session_dir.display());
    println!("  Render style:  {:?}", config.render.style);
    println!("  Message limit: {} chars", config.render.max_message_len);
    println!(
        "  Transcriber:   {}",
        config.transcription.command.as_deref().unwrap_or("[none]")
    );

    if path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `clawbridge init` first");
    }

    Ok(())
}
