//! Request gateway: validates chat requests and starts relay sessions.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use parentic_core::Config;
use parentic_core::config::UpstreamConfig;
use parentic_core::db::DatabaseError;

use crate::prompt::system_prompt;
use crate::session::{ChatStream, DownstreamSink, RelaySession, SessionOutcome, SessionSummary};
use crate::storage::{ChatDatabase, NewChatTurn};
use crate::upstream::{ChatMessage, CompletionRequest, Role, UpstreamClient};

pub const INVALID_MESSAGE: &str = "Message is required and must be a non-empty string";

pub const INVALID_BODY: &str = "Invalid request body";

/// Gateway errors, rendered as `{"error": "..."}` with a matching status.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl GatewayError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_message() -> Self {
        Self::Validation(INVALID_MESSAGE.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(default, alias = "child_context")]
    pub child_context: Option<Vec<String>>,
    #[serde(default, alias = "firebase_uid")]
    pub account_id: Option<String>,
    #[serde(default, alias = "child_id")]
    pub child_id: Option<i64>,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ChatTurnRequest {
    pub message: String,
    pub child_context: Vec<String>,
    pub account_id: Option<String>,
    pub child_id: Option<i64>,
}

impl ChatRequest {
    /// Decode a JSON body.
    ///
    /// A missing or blank message is reported as such; any other shape problem
    /// (e.g. a non-string context item) gets its own message.
    pub fn from_json(body: Value) -> Result<Self, GatewayError> {
        let has_message = body
            .get("message")
            .and_then(Value::as_str)
            .is_some_and(|m| !m.trim().is_empty());
        if !has_message {
            return Err(GatewayError::invalid_message());
        }
        serde_json::from_value(body)
            .map_err(|e| GatewayError::Validation(format!("{INVALID_BODY}: {e}")))
    }

    pub fn validate(self) -> Result<ChatTurnRequest, GatewayError> {
        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(GatewayError::invalid_message)?;

        Ok(ChatTurnRequest {
            message,
            child_context: self.child_context.unwrap_or_default(),
            account_id: self.account_id.filter(|id| !id.trim().is_empty()),
            child_id: self.child_id,
        })
    }
}

/// Accepts chat requests and spawns one relay session per request.
pub struct RequestGateway {
    upstream: Result<UpstreamClient, String>,
    settings: UpstreamConfig,
    channel_capacity: usize,
    history: Option<ChatDatabase>,
}

impl RequestGateway {
    /// Build a gateway from configuration.
    ///
    /// A missing credential does not fail construction; every chat request is
    /// answered with a configuration error instead.
    pub fn new(config: &Config, history: Option<ChatDatabase>) -> Self {
        let upstream = UpstreamClient::new(&config.upstream).map_err(|e| e.to_string());
        Self {
            upstream,
            settings: config.upstream.clone(),
            channel_capacity: config.relay.channel_capacity,
            history,
        }
    }

    pub const fn is_configured(&self) -> bool {
        self.upstream.is_ok()
    }

    /// Fail fast when the completion provider cannot be used.
    pub fn ensure_configured(&self) -> Result<&UpstreamClient, GatewayError> {
        self.upstream
            .as_ref()
            .map_err(|e| GatewayError::Config(e.clone()))
    }

    /// Build the upstream payload for a validated request.
    pub fn completion_request(&self, chat: &ChatTurnRequest) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: system_prompt(&chat.child_context),
                },
                ChatMessage {
                    role: Role::User,
                    content: chat.message.clone(),
                },
            ],
            stream: true,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Validate a request, spawn its session and return the response body.
    pub fn open(&self, request: ChatRequest) -> Result<ChatStream, GatewayError> {
        let upstream = self.ensure_configured()?.clone();
        let chat = request.validate()?;
        let payload = self.completion_request(&chat);

        let (sink, body) = DownstreamSink::channel(self.channel_capacity);
        let session = RelaySession::new(sink);
        let history = self.history.clone();

        info!(
            session_id = %session.id(),
            account_id = chat.account_id.as_deref().unwrap_or("-"),
            child_id = ?chat.child_id,
            context_items = chat.child_context.len(),
            "Chat session accepted"
        );

        tokio::spawn(async move {
            let summary = session.run(upstream.open(&payload)).await;
            record_turn(history.as_ref(), &chat, &summary).await;
        });

        Ok(body)
    }
}

/// Persist a completed turn. Failures are logged, never surfaced.
async fn record_turn(history: Option<&ChatDatabase>, chat: &ChatTurnRequest, summary: &SessionSummary) {
    let (Some(db), Some(account_id)) = (history, chat.account_id.as_deref()) else {
        return;
    };
    if summary.outcome != SessionOutcome::Completed || summary.transcript.is_empty() {
        debug!(session_id = %summary.id, outcome = ?summary.outcome, "Turn not recorded");
        return;
    }

    let turn = NewChatTurn {
        account_id,
        child_id: chat.child_id,
        message: &chat.message,
        response: &summary.transcript,
        child_context: &chat.child_context,
    };
    match db.append_chat_turn(&turn).await {
        Ok(stored) => debug!(session_id = %summary.id, turn_id = stored.id, "Chat turn recorded"),
        Err(e) => warn!(session_id = %summary.id, error = %e, "Failed to record chat turn"),
    }
}
