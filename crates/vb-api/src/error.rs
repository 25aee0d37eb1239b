//! Error types for vb-api

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use vb_calendar::CalendarError;

/// vb-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Calendar(#[from] CalendarError),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Calendar(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Calendar(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // "Could not verify" must stay distinguishable from "unavailable"
        let message = if status.is_server_error() {
            error!("Availability check failed: {}", self);
            format!("Could not verify availability: {}", self)
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
