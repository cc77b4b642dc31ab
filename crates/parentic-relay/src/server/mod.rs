//! HTTP surface of the relay.

mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use parentic_core::config::RelayConfig;

use crate::gateway::RequestGateway;
use crate::storage::ChatDatabase;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<RequestGateway>,
    pub history: Option<ChatDatabase>,
    pub relay: RelayConfig,
}

/// Build the relay router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/chat",
            post(handlers::chat)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/chat-history",
            get(handlers::chat_history)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
