//! IconForge HTTP API
//!
//! Exposes material uploads, previews and ICO forging over axum, with API key
//! authentication, per-client rate limiting, request ids and problem-details
//! error bodies.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{AppConfig, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use server::ApiServer;
pub use state::AppState;
