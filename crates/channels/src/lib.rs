//! Chat channel implementations for clawbridge.
//!
//! Each channel connects to a chat platform and relays messages to/from
//! the bridge. Authorization is handled by the bridge, not here.
//!
//! Available channels:
//! - **Telegram** — Bot API long polling via `teloxide`
//! - **CLI** — Interactive terminal chat (stdin/stdout)

pub mod cli;
pub mod telegram;

pub use cli::CliChannel;
pub use telegram::TelegramChannel;
