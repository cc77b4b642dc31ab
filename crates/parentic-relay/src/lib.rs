//! Parentic Relay Library
//!
//! Streaming chat backend for the Parentic parenting assistant:
//! - Relay sessions that re-frame a completion provider's token stream as
//!   server-sent events
//! - Completion provider client and request payloads
//! - Request validation and system prompt assembly
//! - SQLite chat history for completed turns
//! - axum router exposing chat, history and health endpoints

pub mod gateway;
pub mod prompt;
pub mod server;
pub mod session;
pub mod storage;
pub mod upstream;
