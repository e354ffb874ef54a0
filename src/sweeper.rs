use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::metrics::{EVICTED_CLIENTS, TRACKED_CLIENTS};
use crate::rate_limit::SlidingWindowLimiter;

// Background eviction of client windows whose timestamps have all expired.
// Runs until the task is aborted.
pub async fn sweeper(limiter: Arc<SlidingWindowLimiter>, clock: Arc<dyn Clock>, every: Duration) {
    let mut interval = interval(every);

    info!(interval = ?every, "window sweeper started");

    loop {
        interval.tick().await;

        let removed = limiter.sweep(clock.now_millis());
        let remaining = limiter.client_count();

        EVICTED_CLIENTS.inc_by(removed as f64);
        TRACKED_CLIENTS.set(remaining as f64);

        if removed > 0 {
            debug!(removed, remaining, "swept expired client windows");
        }
    }
}
