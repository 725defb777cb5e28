//! Middleware for the API router

pub mod auth;
pub mod logging;
pub mod rate_limit;
pub mod request_id;

pub use auth::auth_middleware;
pub use logging::logging_middleware;
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use request_id::{current_request_id, request_id_middleware, RequestId};
