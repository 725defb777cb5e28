//! API error types and handling

use axum::{
    extract::multipart::MultipartError,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use iconforge_images::{ErrorKind, ForgeError};
use thiserror::Error;

use crate::{middleware::current_request_id, models::ProblemDetails};

/// Detail shown to callers for internal failures.
const INTERNAL_DETAIL: &str = "An unexpected error occurred while processing the request.";

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded. Please retry later.")]
    RateLimited { retry_after_seconds: u64 },

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Uploaded file exceeds maximum size limit: > {max_bytes} bytes")]
    PayloadTooLarge { max_bytes: usize },

    #[error(transparent)]
    Forge(#[from] ForgeError),
}

impl ApiError {
    /// Classify a multipart failure, reporting a cut-off body as a size violation.
    pub fn from_multipart(err: MultipartError, max_bytes: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { max_bytes }
        } else {
            ApiError::Multipart(err)
        }
    }

    /// HTTP status and problem type for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "authentication_error"),
            ApiError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Multipart(err) => (err.status(), "validation_error"),
            ApiError::PayloadTooLarge { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Forge(err) => match err.kind() {
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation_error"),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, problem_type) = self.status();
        let request_id = current_request_id();

        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(request_id = ?request_id, "Request failed: {}", self);
            INTERNAL_DETAIL.to_string()
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self);
            self.to_string()
        };

        let body = ProblemDetails {
            problem_type: problem_type.to_string(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail,
            request_id,
        };

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        match self {
            ApiError::Unauthorized(_) => {
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
            }
            ApiError::RateLimited { retry_after_seconds } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
            }
            _ => {}
        }
        response
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
