//! Application state for the API server

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderName;
use iconforge_images::{ForgeError, ForgeResult, IconForge};

use crate::{config::ServerConfig, middleware::RateLimiter};

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    /// Material pipeline
    pub forge: IconForge,
    /// Server settings
    pub config: Arc<ServerConfig>,
    /// Per-client request budget
    pub rate_limiter: Arc<RateLimiter>,
    /// Parsed request id header name
    pub request_id_header: HeaderName,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(forge: IconForge, config: ServerConfig) -> ForgeResult<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
        Self::with_rate_limiter(forge, config, rate_limiter)
    }

    /// Create state around an existing rate limiter.
    pub fn with_rate_limiter(
        forge: IconForge,
        config: ServerConfig,
        rate_limiter: Arc<RateLimiter>,
    ) -> ForgeResult<Self> {
        let request_id_header = HeaderName::from_bytes(config.request_id_header.as_bytes())
            .map_err(|_| {
                ForgeError::ConfigError(format!(
                    "request_id_header '{}' is not a valid header name",
                    config.request_id_header
                ))
            })?;

        if config.require_api_key && config.api_key.is_none() {
            tracing::warn!("API key required but none configured: every API request will be rejected");
        }

        Ok(Self {
            forge,
            config: Arc::new(config),
            rate_limiter,
            request_id_header,
            start_time: Instant::now(),
        })
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
