//! Request pipeline stages: client identification, rate limiting, logging.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics::{CHECK_LATENCY, REJECTED_TOTAL, REQUEST_TOTAL, TRACKED_CLIENTS};
use crate::state::AppState;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later";

pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Identifier the limiter partitions quotas by. Inserted into the request
/// extensions so downstream handlers can see who they are serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

/// Resolve the client identifier for a request.
///
/// Forwarded-for wins only when the deployment trusts its proxy; otherwise the
/// peer address, and `"unknown"` when the server was started without
/// connect info.
pub fn client_id(request: &Request, trust_forwarded_for: bool) -> ClientId {
    if trust_forwarded_for {
        if let Some(forwarded) = forwarded_for(request.headers()) {
            return ClientId(forwarded);
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientId(addr.ip().to_string()))
        .unwrap_or_else(|| ClientId("unknown".to_string()))
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();

    let client = client_id(&request, state.trust_forwarded_for);
    let now = state.clock.now_millis();

    let timer = CHECK_LATENCY.start_timer();
    let quota = state.limiter.check_with_quota(&client.0, now);
    timer.observe_duration();
    TRACKED_CLIENTS.set(state.limiter.client_count() as f64);

    if quota.decision.is_reject() {
        REJECTED_TOTAL.inc();
        warn!(client = %client.0, limit = quota.limit, "rate limit exceeded");

        // Retry-After is whole seconds, round up so clients never retry early
        let retry_after = quota.reset_after_ms.div_ceil(1000).max(1);

        return (
            StatusCode::TOO_MANY_REQUESTS,
            [
                (header::RETRY_AFTER, HeaderValue::from(retry_after)),
                (X_RATELIMIT_LIMIT.clone(), HeaderValue::from(quota.limit)),
                (X_RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32)),
            ],
            Json(json!({ "error": RATE_LIMITED_MESSAGE })),
        )
            .into_response();
    }

    debug!(client = %client.0, remaining = quota.remaining, "request allowed");
    request.extensions_mut().insert(client);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(quota.limit));
    headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(quota.remaining));
    response
}

pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}
