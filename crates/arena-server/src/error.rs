//! API error handling.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// API error type returned from handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("request failed: {}", self.message);
        }
        let body = Json(json!({
            "error": {
                "message": self.message,
                "code": self.status.as_str(),
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<arena_core::CatalogError> for ApiError {
    fn from(err: arena_core::CatalogError) -> Self {
        ApiError::internal(err.to_string())
    }
}
