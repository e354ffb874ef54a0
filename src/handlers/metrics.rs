use prometheus::{Encoder, TextEncoder};

use crate::error::ApiError;

// Prometheus text exposition of the default registry
pub async fn metrics_handler() -> Result<String, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {}", e)))?;

    String::from_utf8(buffer).map_err(|e| ApiError::Internal(format!("metrics not utf-8: {}", e)))
}
