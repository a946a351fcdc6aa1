//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error answered to an API client as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400: the request is missing required fields.
    #[error("{0}")]
    Validation(String),

    /// 500 with an optional `details` field.
    #[error("{error}")]
    Internal { error: String, details: Option<String> },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn internal(error: impl Into<String>) -> Self {
        ApiError::Internal { error: error.into(), details: None }
    }

    pub fn internal_with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        ApiError::Internal { error: error.into(), details: Some(details.into()) }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(error) => json!({ "error": error }),
            ApiError::Internal { error, details: None } => json!({ "error": error }),
            ApiError::Internal { error, details: Some(details) } => {
                json!({ "error": error, "details": details })
            }
        };
        (status, Json(body)).into_response()
    }
}
