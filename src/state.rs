use std::sync::Arc;

use crate::clock::Clock;
use crate::rate_limit::SlidingWindowLimiter;

// app's shared state
pub struct AppState {
    pub limiter: Arc<SlidingWindowLimiter>,
    pub clock: Arc<dyn Clock>,
    pub trust_forwarded_for: bool, // read client id from X-Forwarded-For
}

impl AppState {
    pub fn new(limiter: SlidingWindowLimiter, clock: Arc<dyn Clock>) -> Self {
        Self {
            limiter: Arc::new(limiter),
            clock,
            trust_forwarded_for: false,
        }
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}
