//! Per-client sliding window rate limiting

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use iconforge_images::{Clock, SystemClock};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Bucket used when the client address is unknown.
pub const ANONYMOUS_BUCKET: &str = "anonymous";

/// Length of the rate limit window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Keeps the timestamps of accepted requests per client for the last window.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    events: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Allow `limit` requests per client in any 60 second window.
    pub fn new(limit: u32) -> Self {
        Self::with_clock(limit, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit: limit as usize,
            window: WINDOW,
            clock,
            events: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request for `client` if it is under the limit.
    ///
    /// Returns the time until the oldest event leaves the window when the
    /// request is rejected. Rejected requests are not recorded. Clients whose
    /// window has emptied are forgotten.
    pub async fn check(&self, client: &str) -> Result<(), Duration> {
        let now = self.clock.now();
        let window = self.window;
        let mut events = self.events.lock().await;

        events.retain(|_, log| {
            while log
                .front()
                .is_some_and(|oldest| now.saturating_duration_since(*oldest) >= window)
            {
                log.pop_front();
            }
            !log.is_empty()
        });

        let log = events.entry(client.to_string()).or_default();
        if log.len() >= self.limit {
            let retry_after = log
                .front()
                .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(window);
            if log.is_empty() {
                events.remove(client);
            }
            return Err(retry_after);
        }

        log.push_back(now);
        Ok(())
    }

    /// Number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.events.lock().await.len()
    }
}

/// Resolve the bucket for a request: socket address, then `X-Forwarded-For`.
fn client_key(request: &Request<Body>) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| ANONYMOUS_BUCKET.to_string())
}

/// Reject requests over the per-minute budget with 429.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.enable_rate_limit {
        return Ok(next.run(request).await);
    }

    let client = client_key(&request);
    if let Err(retry_after) = state.rate_limiter.check(&client).await {
        warn!("Rate limit exceeded for {}", client);
        return Err(ApiError::RateLimited {
            retry_after_seconds: retry_after.as_secs().max(1),
        });
    }

    Ok(next.run(request).await)
}
