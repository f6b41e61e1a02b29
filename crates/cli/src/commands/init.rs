//! `clawbridge init` — Write a default config file.

use std::path::Path;

use clawbridge_config::AppConfig;

use super::resolve_config_path;

pub async fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_config_path(config_path);

    println!("🦀 clawbridge — First-Time Setup");
    println!("================================\n");

    if path.exists() && !force {
        println!("⚠️  Config already exists at: {}", path.display());
        println!("   Edit it manually, or re-run with --force to overwrite.\n");
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("✅ Created config at: {}", path.display());

    println!("\n📝 Next steps:");
    println!("   1. Set TELEGRAM_BOT_TOKEN (or telegram.bot_token)");
    println!("   2. Set TELEGRAM_ALLOWED_USERS to your numeric user ID");
    println!("   3. Run: clawbridge doctor");
    println!("   4. Run: clawbridge serve\n");

    Ok(())
}
