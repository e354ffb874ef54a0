use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Invalid limiter parameters, raised at construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max requests per window must be greater than 0")]
    ZeroMaxRequests,
    #[error("rate window must be greater than 0 ms")]
    ZeroWindow,
}

/// Errors a handler can hand back to the client as JSON.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({
            "error": {
                "status": status.as_u16(),
                "message": self.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}
