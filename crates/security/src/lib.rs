//! Security module for clawbridge.
//!
//! Provides:
//! - **Allowlists**: fail-closed sender validation by numeric user ID

pub mod allowlist;

pub use allowlist::{AllowList, SenderCheckResult};
