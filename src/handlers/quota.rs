use axum::{Extension, Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::middleware::ClientId;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub client: String,
    pub limit: u32,
    pub window_ms: u64,
    pub remaining: u32,
}

// Reports the caller's quota. Sits behind the limiter, so the call itself is counted.
pub async fn quota_handler(
    State(state): State<Arc<AppState>>,
    Extension(ClientId(client)): Extension<ClientId>,
) -> Json<QuotaResponse> {
    let now = state.clock.now_millis();
    let remaining = state.limiter.remaining(&client, now);

    Json(QuotaResponse {
        client,
        limit: state.limiter.max_requests(),
        window_ms: state.limiter.window_ms(),
        remaining,
    })
}
