//! Request payload, reply and error types for the completion provider.

use std::pin::Pin;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_stream::Stream;

/// Message used when the provider rejects a request without a readable reason.
pub const REJECTED_FALLBACK: &str = "Failed to get response from completion provider";

/// Completion provider errors.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion provider API key not configured")]
    MissingApiKey,

    #[error("Stream transport failed: {0}")]
    Transport(String),
}

/// Raw upstream body as a stream of network chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, UpstreamError>> + Send>>;

/// Outcome of issuing the upstream request.
pub enum UpstreamReply<S> {
    /// Success status; the body is the token stream.
    Accepted(S),
    /// Non-success status with the best-effort error message from the body.
    Rejected { status: u16, message: String },
}

impl<S> std::fmt::Debug for UpstreamReply<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted(_) => f.write_str("Accepted(..)"),
            Self::Rejected { status, message } => f
                .debug_struct("Rejected")
                .field("status", status)
                .field("message", message)
                .finish(),
        }
    }
}

/// Chat role in the completion payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One message of the completion payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Streaming chat-completions request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Extract a human-readable message from an error response body.
///
/// Accepts `{"error":{"message":"..."}}` and `{"error":"..."}`; anything else,
/// including a non-JSON or empty body, yields [`REJECTED_FALLBACK`].
pub fn rejection_message(body: &[u8]) -> String {
    let Ok(raw) = serde_json::from_slice::<Value>(body) else {
        return REJECTED_FALLBACK.to_string();
    };
    let error = raw.get("error");
    error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| error.and_then(Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map_or_else(|| REJECTED_FALLBACK.to_string(), String::from)
}
