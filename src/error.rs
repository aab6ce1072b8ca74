//! Error surface of the analysis service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::content::ContentError;
use crate::vision::VisionError;

/// Failures acquiring the text to analyze. Reasoning failures never show up here.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error("Could not extract any text from the provided input.")]
    EmptyInput,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Rate limit exceeded. Please wait a moment before making another request. Maximum {0} requests per minute.")]
    RateLimited(usize),
    #[error("An internal server error occurred: {0}")]
    Internal(String),
}

impl From<AnalyzeError> for ApiError {
    fn from(e: AnalyzeError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = ErrorResponse { error: kind.to_string(), message: self.to_string() };
        (status, Json(body)).into_response()
    }
}
