//! Configuration loading, validation, and management for clawbridge.
//!
//! Loads configuration from `~/.clawbridge/config.toml` with environment
//! variable overrides. Validates all settings at startup; the result is
//! immutable for the life of the process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.clawbridge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Telegram transport settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// External agent process settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Output rendering settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Voice transcription settings
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Local terminal channel settings
    #[serde(default)]
    pub cli: CliConfig,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Numeric user IDs allowed to talk to the agent. Empty = deny all.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("allowed_users", &self.allowed_users)
            .finish()
    }
}

/// How the relay asks the agent to resume prior conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationMode {
    /// Look up the most recently updated session on disk and pass `--session <id>`.
    #[default]
    LatestSession,
    /// Pass `--continue` and let the agent pick its own last session.
    ContinueLast,
    /// Always start a fresh session.
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent executable
    #[serde(default = "default_agent_command")]
    pub command: String,

    /// Subcommand that runs a single prompt
    #[serde(default = "default_agent_subcommand")]
    pub subcommand: String,

    /// Server endpoint the agent attaches to
    #[serde(default = "default_attach_url")]
    pub attach_url: String,

    /// Working directory for the agent process
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    /// Hard wall-clock limit per attempt
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub continuation: ContinuationMode,

    /// Directory holding the agent's persisted session records
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,

    /// File name prefix of session records
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,
}

fn default_agent_command() -> String {
    "opencode".into()
}
fn default_agent_subcommand() -> String {
    "run".into()
}
fn default_attach_url() -> String {
    "http://localhost:4096".into()
}
fn default_workdir() -> PathBuf {
    PathBuf::from("/work")
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_session_dir() -> PathBuf {
    PathBuf::from("/data/opencode/storage/session/global")
}
fn default_session_prefix() -> String {
    "ses_".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            subcommand: default_agent_subcommand(),
            attach_url: default_attach_url(),
            workdir: default_workdir(),
            timeout_secs: default_timeout_secs(),
            continuation: ContinuationMode::default(),
            session_dir: default_session_dir(),
            session_prefix: default_session_prefix(),
        }
    }
}

/// Which tool-call rendering variant to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStyle {
    /// Collapse tool runs into "N tool calls, M errors".
    #[default]
    Summary,
    /// Show each tool run as an expandable quote.
    Collapsible,
}

impl std::str::FromStr for RenderStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "collapsible" => Ok(Self::Collapsible),
            other => Err(ConfigError::ValidationError(format!(
                "unknown render style '{other}' (expected 'summary' or 'collapsible')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub style: RenderStyle,

    /// Per-message character limit of the chat transport
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    /// Seconds between "typing" pings while the agent runs
    #[serde(default = "default_typing_interval_secs")]
    pub typing_interval_secs: u64,
}

fn default_max_message_len() -> usize {
    4096
}
fn default_typing_interval_secs() -> u64 {
    4
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            style: RenderStyle::default(),
            max_message_len: default_max_message_len(),
            typing_interval_secs: default_typing_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Speech-to-text executable. Unset = voice messages are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments; `{input}` is replaced with the audio file path.
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// User ID the local terminal channel reports for its messages
    #[serde(default)]
    pub sender_id: i64,
}

impl AppConfig {
    /// Load configuration from `path`, or the default location
    /// (~/.clawbridge/config.toml), then apply environment overrides:
    /// - `TELEGRAM_BOT_TOKEN`
    /// - `TELEGRAM_ALLOWED_USERS` (comma separated)
    /// - `CLAWBRIDGE_AGENT_COMMAND`
    /// - `CLAWBRIDGE_WORKDIR`
    /// - `CLAWBRIDGE_RENDER_STYLE`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Self::config_path();
        let mut config = Self::load_from(path.unwrap_or(&default_path))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = Some(token.trim().to_string());
        }

        if let Some(raw) = lookup("TELEGRAM_ALLOWED_USERS") {
            self.telegram.allowed_users = parse_allowed_users(&raw);
        }

        if let Some(command) = lookup("CLAWBRIDGE_AGENT_COMMAND").filter(|c| !c.trim().is_empty()) {
            self.agent.command = command;
        }

        if let Some(dir) = lookup("CLAWBRIDGE_WORKDIR").filter(|d| !d.trim().is_empty()) {
            self.agent.workdir = PathBuf::from(dir);
        }

        if let Some(style) = lookup("CLAWBRIDGE_RENDER_STYLE") {
            self.render.style = style.parse()?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".clawbridge")
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.timeout_secs must be > 0".into(),
            ));
        }

        if self.render.max_message_len == 0 {
            return Err(ConfigError::ValidationError(
                "render.max_message_len must be > 0".into(),
            ));
        }

        if self.render.typing_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "render.typing_interval_secs must be > 0".into(),
            ));
        }

        if self.agent.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.command must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if a bot token is available (from config or environment).
    pub fn has_bot_token(&self) -> bool {
        self.telegram.bot_token.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Parse a comma separated list of numeric user IDs.
///
/// Entries that are not plain digit strings are ignored, so a typo never
/// widens access.
pub fn parse_allowed_users(raw: &str) -> Vec<i64> {
    let mut users: Vec<i64> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|s| s.parse().ok())
        .collect();
    users.sort_unstable();
    users.dedup();
    users
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
