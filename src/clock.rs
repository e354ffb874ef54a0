//! Time sources for the limiter.
//!
//! The limiter takes `now` as an argument; the HTTP layer and the sweeper read
//! it from a `Clock` held in the app state, which lets tests drive time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // pre-epoch system time clamps to 0
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can keep a handle while the app
/// state owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start_millis)),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
