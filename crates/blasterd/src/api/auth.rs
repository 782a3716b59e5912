use std::sync::Arc;

use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use tracing::warn;

use super::response::ApiError;
use super::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Reject requests without the configured bearer token.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.token.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX));

    if provided == Some(expected) {
        next.run(request).await
    } else {
        warn!("Wrong token provided for {}", request.uri().path());
        ApiError::Forbidden.into_response()
    }
}
