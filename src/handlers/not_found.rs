use axum::extract::OriginalUri;
use axum::http::Method;

use crate::error::ApiError;

// Fallback for every unregistered route. OriginalUri keeps the /api prefix
// that nesting strips.
pub async fn not_found_handler(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("Route not found: {} {}", method, uri.path()))
}
