//! The relay core of clawbridge.
//!
//! A chat message becomes exactly one agent run (or two, on a stale
//! session):
//!
//! 1. **Authorize** the sender against the allow-list
//! 2. **Transcribe** voice notes into a prompt
//! 3. **Serialize** through the process-wide [`RequestGate`]
//! 4. **Invoke** the external agent with a timeout, retrying once without
//!    the continuation if it fails
//! 5. **Render** the output and send it back in size-limited chunks
//!
//! While the agent runs, the chat shows a typing indicator that is always
//! cancelled when the run ends.

pub mod bridge;
pub mod gate;
pub mod invoker;
pub mod process;
pub mod session;
pub mod transcribe;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use bridge::{Bridge, HELP_TEXT, Handled, TRANSCRIPTION_FAILED, unauthorized_reply};
pub use gate::{GatePermit, RequestGate};
pub use invoker::{
    AgentInvoker, Continuation, Invocation, InvocationAttempt, InvokerSettings, NO_RESPONSE,
    timeout_message,
};
pub use process::TokioProcessRunner;
pub use session::{SessionLocator, SessionRecord};
pub use transcribe::CommandTranscriber;
