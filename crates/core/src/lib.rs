//! # clawbridge core
//!
//! Domain types, traits, and error definitions for the clawbridge relay.
//! This crate has **zero framework dependencies**: it defines the seams that
//! every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Channel`]: the chat transport (send, formatted send, typing, download)
//! - [`Transcriber`]: voice-to-text
//! - [`ProcessRunner`]: bounded execution of the external agent process
//!
//! Implementations live in their respective crates, which keeps the relay
//! pipeline testable with scripted stand-ins.

pub mod channel;
pub mod error;
pub mod process;
pub mod transcribe;

// Re-export key types at crate root for ergonomics
pub use channel::{Attachment, AttachmentKind, Channel, ChannelId, ChannelMessage};
pub use error::{Error, Result};
pub use process::{ProcessOutcome, ProcessRunner, ProcessSpec};
pub use transcribe::Transcriber;
