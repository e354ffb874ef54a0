//! Sliding-window request limiter.
//!
//! Every client gets its own trail of accepted-request timestamps (milliseconds
//! since the Unix epoch). A request is allowed while fewer than `max_requests`
//! timestamps lie inside the trailing window, and rejected requests are not
//! recorded. Time is always supplied by the caller, so the limiter never reads
//! a clock on its own.

use dashmap::DashMap;
use std::collections::VecDeque;

use crate::error::ConfigError;

/// Outcome of a single `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject,
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Decision::Reject)
    }
}

/// Decision plus the quota figures the HTTP layer turns into headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub decision: Decision,
    pub limit: u32,
    // quota left after this request was counted (or not)
    pub remaining: u32,
    // ms until the oldest counted request leaves the window, 0 if none
    pub reset_after_ms: u64,
}

// Accepted timestamps for one client, oldest first.
#[derive(Debug, Default)]
struct ClientWindow {
    hits: VecDeque<u64>,
}

impl ClientWindow {
    fn prune(&mut self, now: u64, window_ms: u64) {
        // retain instead of popping from the front: callers with skewed
        // clocks may hand us out-of-order timestamps
        self.hits.retain(|&t| is_live(t, now, window_ms));
    }

    fn live_count(&self, now: u64, window_ms: u64) -> usize {
        self.hits
            .iter()
            .filter(|&&t| is_live(t, now, window_ms))
            .count()
    }

    fn reset_after(&self, now: u64, window_ms: u64) -> u64 {
        self.hits
            .iter()
            .min()
            .map(|&oldest| window_ms - now.saturating_sub(oldest).min(window_ms))
            .unwrap_or(0)
    }
}

// An entry exactly `window_ms` old is already expired.
fn is_live(t: u64, now: u64, window_ms: u64) -> bool {
    now.saturating_sub(t) < window_ms
}

/// Per-client sliding-window limiter.
///
/// The client map is a `DashMap`; `check` holds the entry's shard lock for the
/// whole prune/decide/append sequence, so two concurrent requests from the
/// same client can never both observe a not-yet-full window.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window_ms: u64,
    clients: DashMap<String, ClientWindow>,
}

impl SlidingWindowLimiter {
    /// Create a limiter allowing `max_requests` per `window_ms` milliseconds.
    ///
    /// Both values must be non-zero.
    pub fn new(max_requests: u32, window_ms: u64) -> Result<Self, ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }

        Ok(Self {
            max_requests,
            window_ms,
            clients: DashMap::new(),
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Number of client windows currently held in memory.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Decide whether `client_id` may make a request at `now`.
    ///
    /// On `Allow` the request is recorded; on `Reject` nothing changes.
    pub fn check(&self, client_id: &str, now: u64) -> Decision {
        self.check_with_quota(client_id, now).decision
    }

    /// Same as [`check`](Self::check), also reporting the quota left.
    pub fn check_with_quota(&self, client_id: &str, now: u64) -> QuotaStatus {
        let mut window = match self.clients.get_mut(client_id) {
            Some(window) => window,
            None => self.clients.entry(client_id.to_string()).or_default(),
        };

        window.prune(now, self.window_ms);

        let limit = self.max_requests as usize;
        let decision = if window.hits.len() >= limit {
            Decision::Reject
        } else {
            window.hits.push_back(now);
            Decision::Allow
        };

        QuotaStatus {
            decision,
            limit: self.max_requests,
            remaining: limit.saturating_sub(window.hits.len()) as u32,
            reset_after_ms: window.reset_after(now, self.window_ms),
        }
    }

    /// Quota left for `client_id` at `now`, without recording anything.
    pub fn remaining(&self, client_id: &str, now: u64) -> u32 {
        let used = self
            .clients
            .get(client_id)
            .map(|window| window.live_count(now, self.window_ms))
            .unwrap_or(0);

        (self.max_requests as usize).saturating_sub(used) as u32
    }

    /// Drop every client whose window holds no live timestamps at `now`.
    ///
    /// Returns how many clients were removed. A missing entry behaves exactly
    /// like an empty one, so sweeping never changes a later decision.
    pub fn sweep(&self, now: u64) -> usize {
        let before = self.clients.len();
        let window_ms = self.window_ms;

        self.clients.retain(|_, window| {
            window.prune(now, window_ms);
            !window.hits.is_empty()
        });

        before.saturating_sub(self.clients.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn limiter(max: u32, window: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(max, window).unwrap()
    }

    #[test]
    fn rejects_zero_parameters() {
        assert!(matches!(
            SlidingWindowLimiter::new(0, 1000),
            Err(ConfigError::ZeroMaxRequests)
        ));
        assert!(matches!(
            SlidingWindowLimiter::new(3, 0),
            Err(ConfigError::ZeroWindow)
        ));
    }

    #[test]
    fn walkthrough_three_per_second() {
        let l = limiter(3, 1000);

        assert_eq!(l.check("A", 0), Decision::Allow);
        assert_eq!(l.check("A", 100), Decision::Allow);
        assert_eq!(l.check("A", 200), Decision::Allow);
        assert_eq!(l.check("A", 300), Decision::Reject);

        // t=0 has expired, 100 and 200 are still live
        assert_eq!(l.check("A", 1001), Decision::Allow);
        assert_eq!(l.check("A", 1002), Decision::Reject);
    }

    #[test]
    fn boundary_timestamp_is_expired() {
        let l = limiter(1, 1000);

        assert!(l.check("A", 500).is_allow());
        assert!(l.check("A", 1499).is_reject());
        assert!(l.check("A", 1500).is_allow());
    }

    #[test]
    fn rejected_requests_are_not_counted() {
        let l = limiter(2, 1000);

        assert!(l.check("A", 0).is_allow());
        assert!(l.check("A", 10).is_allow());
        for t in 20..30 {
            assert!(l.check("A", t).is_reject());
        }

        // only the two accepted hits age out; rejects left no trace
        assert!(l.check("A", 1000).is_allow());
        assert!(l.check("A", 1010).is_allow());
        assert!(l.check("A", 1011).is_reject());
    }

    #[test]
    fn clients_are_independent() {
        let l = limiter(1, 1000);

        assert!(l.check("A", 0).is_allow());
        assert!(l.check("B", 0).is_allow());
        assert!(l.check("A", 1).is_reject());
        assert!(l.check("B", 1).is_reject());
        assert!(l.check("C", 1).is_allow());
    }

    #[test]
    fn quota_status_reports_remaining_and_reset() {
        let l = limiter(3, 1000);

        let first = l.check_with_quota("A", 100);
        assert_eq!(first.decision, Decision::Allow);
        assert_eq!(first.limit, 3);
        assert_eq!(first.remaining, 2);
        assert_eq!(first.reset_after_ms, 1000);

        l.check("A", 200);
        l.check("A", 300);

        let rejected = l.check_with_quota("A", 400);
        assert_eq!(rejected.decision, Decision::Reject);
        assert_eq!(rejected.remaining, 0);
        // hit at 100 leaves the window at 1100
        assert_eq!(rejected.reset_after_ms, 700);
    }

    #[test]
    fn remaining_does_not_record() {
        let l = limiter(2, 1000);

        assert_eq!(l.remaining("A", 0), 2);
        assert_eq!(l.client_count(), 0);

        l.check("A", 0);
        assert_eq!(l.remaining("A", 10), 1);
        assert_eq!(l.remaining("A", 10), 1);
        assert_eq!(l.remaining("A", 1000), 2);
    }

    #[test]
    fn sweep_drops_only_expired_clients() {
        let l = limiter(5, 1000);

        l.check("old", 0);
        l.check("fresh", 900);
        l.check("mixed", 100);
        l.check("mixed", 800);
        assert_eq!(l.client_count(), 3);

        assert_eq!(l.sweep(1500), 1);
        assert_eq!(l.client_count(), 2);

        assert_eq!(l.sweep(5000), 2);
        assert_eq!(l.client_count(), 0);
    }

    #[test]
    fn sweep_does_not_change_decisions() {
        let swept = limiter(2, 1000);
        let kept = limiter(2, 1000);

        for l in [&swept, &kept] {
            l.check("A", 0);
            l.check("A", 10);
        }
        swept.sweep(2000);

        for t in [2000, 2001, 2002] {
            assert_eq!(swept.check("A", t), kept.check("A", t));
        }
    }

    #[test]
    fn concurrent_checks_never_exceed_quota() {
        let l = Arc::new(limiter(50, 60_000));
        let allowed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let l = Arc::clone(&l);
                let allowed = Arc::clone(&allowed);
                thread::spawn(move || {
                    for i in 0..100 {
                        if l.check("shared", 1_000 + i).is_allow() {
                            allowed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(allowed.load(Ordering::Relaxed), 50);
    }
}
