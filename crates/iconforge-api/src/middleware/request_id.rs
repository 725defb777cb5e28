//! Request id propagation

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::state::AppState;

/// Longest caller-supplied id that is honoured.
const MAX_REQUEST_ID_LEN: usize = 128;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Request id attached to the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Id of the request being served by the current task, if any.
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

fn incoming_id(request: &Request<Body>, state: &AppState) -> Option<String> {
    let value = request.headers().get(&state.request_id_header)?.to_str().ok()?;
    let value = value.trim();
    if value.is_empty() || value.len() > MAX_REQUEST_ID_LEN {
        return None;
    }
    Some(value.to_string())
}

/// Honour or mint a request id, run the rest of the stack inside its span and
/// echo it on the response.
pub async fn request_id_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = incoming_id(&request, &state).unwrap_or_else(|| Uuid::new_v4().to_string());
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = REQUEST_ID
        .scope(request_id.clone(), next.run(request).instrument(span))
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(state.request_id_header.clone(), value);
    }
    response
}
