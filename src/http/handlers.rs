//! Axum handlers. Each one hands the raw body to the relay core.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::http::server::AppState;
use crate::relay::{Operation, ProxyResponse};

/// POST /api/shopify-proxy
pub async fn token_exchange(State(state): State<AppState>, body: Bytes) -> ProxyResponse {
    state.relay.handle_body(Operation::TokenExchange, &body).await
}

/// POST /api/shopify-request
pub async fn resource_fetch(State(state): State<AppState>, body: Bytes) -> ProxyResponse {
    state.relay.handle_body(Operation::Resource, &body).await
}

/// POST /api/validate-license
pub async fn validate_license(State(state): State<AppState>, body: Bytes) -> ProxyResponse {
    state.relay.handle_body(Operation::License, &body).await
}

/// OPTIONS on an API route without CORS pre-flight headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    tracing::debug!("Health check");
    Json(json!({ "status": "ok" }))
}
