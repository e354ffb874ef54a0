//! Per-client sliding-window rate limiting for axum services.
//!
//! The core is [`rate_limit::SlidingWindowLimiter`]; [`app`] wires it into a
//! router with health, metrics and quota endpoints.

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod state;
pub mod sweeper;

use axum::{Router, middleware::from_fn, middleware::from_fn_with_state, routing::get};
use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ApiError, ConfigError};
pub use rate_limit::{Decision, QuotaStatus, SlidingWindowLimiter};
pub use state::AppState;

/// Build the gateway router.
///
/// `/health` and `/metrics` stay reachable for probes; everything under
/// `/api` goes through the limiter.
pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/quota", get(handlers::quota_handler))
        .route_layer(from_fn_with_state(
            Arc::clone(&state),
            middleware::rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api", api)
        .fallback(handlers::not_found_handler)
        .layer(from_fn(middleware::request_logger))
        .with_state(state)
}
