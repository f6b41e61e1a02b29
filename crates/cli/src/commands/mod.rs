pub mod chat;
pub mod doctor;
pub mod format;
pub mod init;
pub mod serve;
pub mod status;

use std::path::{Path, PathBuf};

use clawbridge_config::AppConfig;

/// Load config from `path` or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load(path).map_err(|e| format!("Failed to load config: {e}").into())
}

pub fn resolve_config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path)
}
