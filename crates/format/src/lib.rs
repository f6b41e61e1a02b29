//! Output formatting for clawbridge.
//!
//! Turns the raw terminal-style transcript of an agent run into chat-ready
//! messages:
//!
//! ```text
//! raw output ─▶ strip_ansi ─▶ classify ─▶ group_blocks ─▶ Renderer ─▶ split_message
//! ```
//!
//! Everything here is pure and synchronous; a formatting pass lives and dies
//! within a single request.

pub mod ansi;
pub mod chunk;
pub mod classify;
pub mod markdown;
pub mod render;

pub use ansi::strip_ansi;
pub use chunk::{Boundary, Chunk, split_chunks, split_message};
pub use classify::{ClassifiedLine, LineKind, classify, classify_lines};
pub use markdown::unescape_markup;
pub use render::{Block, RenderedFragment, Renderer, group_blocks};
