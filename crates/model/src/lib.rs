//! A provider-neutral protocol for chat models with tool calling.
//!
//! This crate establishes the types the session uses to talk to a chat
//! completion service, so that the resolution loop never depends on the
//! wire format of a particular runtime.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
