//! Core logic of the chat client: the tool registry and dispatcher, the
//! conversation transcript, and the loop that resolves one user turn.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod conversation;
mod model_client;
mod session;
pub mod tool;

pub use session::{
    DEFAULT_MAX_EMPTY_RETRIES, DEFAULT_MAX_TOOL_ROUNDS,
    EMPTY_REPLY_CORRECTION, FALLBACK_MESSAGE, ReplyKind, Session,
    SessionBuilder, TranscriptSource, TurnError, TurnOutcome,
};
