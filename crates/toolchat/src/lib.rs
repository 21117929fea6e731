//! A terminal chat client for local Ollama models, with a built-in toolset.
//!
//! The crate includes a CLI for use in the terminal. It can also be used as
//! a library: [`SessionBuilder`] wires a model provider to the built-in
//! tools and produces a ready [`Session`].

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod session;
pub mod tools;

pub use session::SessionBuilder;
pub use toolchat_core::Session;

/// Re-exports of [`toolchat_core`] crate.
pub mod core {
    pub use toolchat_core::*;
}
