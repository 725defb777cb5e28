//! Request logging middleware

use std::time::{Duration, Instant};

use axum::{body::Body, http::Request, middleware::Next, response::Response};

/// Requests slower than this are logged at `warn`.
const SLOW_REQUEST: Duration = Duration::from_secs(2);

/// Log each request and its outcome.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    tracing::info!("Request: {} {}", method, uri);

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    if duration > SLOW_REQUEST {
        tracing::warn!("Slow request: {} {} took {:?}", method, uri, duration);
    }

    tracing::info!(
        "Response: {} {} - {} in {}ms",
        method,
        uri,
        response.status(),
        duration.as_millis()
    );

    response
}
