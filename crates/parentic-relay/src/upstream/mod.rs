//! Completion provider client.
//!
//! Opens one token-streaming request per chat session and hands the raw byte
//! stream to the relay session.

mod client;
mod types;

pub use client::UpstreamClient;
pub use types::*;
