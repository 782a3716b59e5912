use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::engine::ExecError;
use crate::intents::IntentError;

/// Envelope of every API response
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub result: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            result: "success",
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload<T: Serialize>(message: impl Into<String>, payload: &T) -> Result<Self, ApiError> {
        let payload = serde_json::to_value(payload).map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self {
            payload: Some(payload),
            ..Self::success(message)
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: "error",
            message: message.into(),
            payload: None,
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Wrong token provided!")]
    Forbidden,

    #[error("{0}")]
    Busy(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Busy(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (status, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

impl From<ExecError> for ApiError {
    fn from(e: ExecError) -> Self {
        if e.is_not_found() {
            return ApiError::NotFound(e.to_string());
        }
        match e {
            ExecError::Busy => ApiError::Busy(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<IntentError> for ApiError {
    fn from(e: IntentError) -> Self {
        match e {
            IntentError::NotFound(_) => ApiError::NotFound(e.to_string()),
            e => ApiError::BadRequest(e.to_string()),
        }
    }
}
