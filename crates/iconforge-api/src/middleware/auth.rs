//! API key authentication

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::{error::ApiError, state::AppState};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

fn keys_match(expected: &str, provided: &str) -> bool {
    expected.len() == provided.len()
        && expected
            .bytes()
            .zip(provided.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Require a matching `X-API-Key` when `require_api_key` is enabled.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.require_api_key {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match (state.config.api_key.as_deref(), provided) {
        (Some(expected), Some(provided)) if keys_match(expected, provided) => {
            Ok(next.run(request).await)
        }
        _ => Err(ApiError::Unauthorized("Invalid API key provided.".to_string())),
    }
}
