//! Route handlers for chat, history and health.

use std::fmt::Display;
use std::str::FromStr;

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use super::AppState;
use crate::gateway::{ChatRequest, GatewayError};
use crate::session::ChatStream;
use crate::storage::HistoryEntry;

/// `POST /api/chat` — stream a completion back as server-sent events.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, GatewayError> {
    state.gateway.ensure_configured()?;

    let Json(body) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected chat body");
        GatewayError::invalid_message()
    })?;
    let request = ChatRequest::from_json(body)?;

    let body = state.gateway.open(request)?;
    Ok(event_stream(body))
}

fn event_stream(body: ChatStream) -> Response {
    (
        [
            ("content-type", "text/event-stream"),
            ("cache-control", "no-cache"),
            ("x-accel-buffering", "no"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

/// Query of `GET /api/chat-history`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default, alias = "firebase_uid")]
    pub account_id: Option<String>,
    #[serde(default, alias = "child_id", deserialize_with = "blank_as_none")]
    pub child_id: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<u32>,
}

/// Parse an optional query value, treating an empty one as absent.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// `GET /api/chat-history` — completed turns, oldest first.
pub async fn chat_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntry>>, GatewayError> {
    let Query(query) =
        query.map_err(|rejection| GatewayError::Validation(rejection.body_text()))?;

    let account_id = query
        .account_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| GatewayError::Validation("accountId is required".into()))?;

    let Some(db) = state.history.as_ref() else {
        return Ok(Json(Vec::new()));
    };

    let limit = query
        .limit
        .unwrap_or(state.relay.history_default_limit)
        .clamp(1, state.relay.history_max_limit.max(1));

    let turns = db.read_chat_history(&account_id, query.child_id, limit).await?;
    Ok(Json(turns.into_iter().map(HistoryEntry::from).collect()))
}

/// CORS preflight.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

pub async fn health() -> &'static str {
    "ok"
}
