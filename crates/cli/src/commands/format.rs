//! `clawbridge format` — Show how raw agent output would be delivered.

use std::path::{Path, PathBuf};

use clawbridge_config::RenderStyle;
use clawbridge_format::{Renderer, split_message, strip_ansi};
use tokio::io::AsyncReadExt;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    file: Option<PathBuf>,
    style: Option<RenderStyle>,
    max_len: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;

    let raw = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let renderer = Renderer::new(style.unwrap_or(config.render.style));
    let max_len = max_len.unwrap_or(config.render.max_message_len).max(1);
    let rendered = renderer.render(strip_ansi(&raw).trim());
    let chunks = split_message(&rendered, max_len);

    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "── chunk {}/{} ({} chars) ──",
            i + 1,
            chunks.len(),
            chunk.chars().count()
        );
        println!("{chunk}");
    }

    Ok(())
}
