//! Data models for chat history storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatTurn {
    pub id: i64,
    pub account_id: String,
    pub child_id: Option<i64>,
    pub message: String,
    pub response: String,
    /// JSON array of the context items sent with the message, if any.
    pub child_context: Option<String>,
    pub created_at: i64,
}

/// Parameters for recording a completed turn.
#[derive(Debug, Clone, Copy)]
pub struct NewChatTurn<'a> {
    pub account_id: &'a str,
    pub child_id: Option<i64>,
    pub message: &'a str,
    pub response: &'a str,
    pub child_context: &'a [String],
}

/// One turn as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub message: String,
    pub response: String,
    pub child_id: Option<i64>,
    pub timestamp: i64,
}

impl From<ChatTurn> for HistoryEntry {
    fn from(turn: ChatTurn) -> Self {
        Self {
            id: turn.id,
            message: turn.message,
            response: turn.response,
            child_id: turn.child_id,
            timestamp: turn.created_at,
        }
    }
}
