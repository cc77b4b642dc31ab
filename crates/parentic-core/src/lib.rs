//! `Parentic` Core Library
//!
//! Shared functionality for `Parentic` components:
//! - SSE framing for the completion-provider stream and the browser stream
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod sse;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
