use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::clock::Clock;

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_WINDOW_SECONDS: i64 = 60;

/// Sliding-window limiter keyed by caller identity. In-memory and
/// process-local; a restart forgets every window.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
    hits: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        assert!(limit > 0, "a rate limit of zero rejects everything");
        Self {
            limit,
            window,
            clock,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(DEFAULT_LIMIT, Duration::seconds(DEFAULT_WINDOW_SECONDS), clock)
    }

    /// Record a request for `identity` if it fits in the window. Rejected
    /// requests are not recorded.
    pub fn check(&self, identity: &str) -> bool {
        let now = self.clock.now();
        let cutoff = now - self.window;
        let mut hits = self.hits.lock().unwrap_or_else(|p| p.into_inner());

        // Drop identities whose windows have fully drained.
        hits.retain(|_, q| q.back().is_some_and(|t| *t > cutoff));

        let q = hits.entry(identity.to_string()).or_default();
        while q.front().is_some_and(|t| *t <= cutoff) {
            q.pop_front();
        }

        if q.len() >= self.limit {
            warn!(identity, limit = self.limit, "chat rate limit exceeded");
            return false;
        }
        q.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn limiter() -> (ManualClock, RateLimiter) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());
        let limiter = RateLimiter::with_defaults(Arc::new(clock.clone()));
        (clock, limiter)
    }

    #[test]
    fn eleventh_request_in_window_is_rejected() {
        let (clock, limiter) = limiter();
        for _ in 0..10 {
            assert!(limiter.check("u1"));
            clock.advance(Duration::seconds(1));
        }
        assert!(!limiter.check("u1"));
        assert!(limiter.check("u2"));
    }

    #[test]
    fn window_slides_rather_than_resets() {
        let (clock, limiter) = limiter();
        // 5 at t=0, 5 at t=30.
        for _ in 0..5 {
            assert!(limiter.check("u"));
        }
        clock.advance(Duration::seconds(30));
        for _ in 0..5 {
            assert!(limiter.check("u"));
        }
        assert!(!limiter.check("u"));

        // At t=60 the first five fall out; the second five still count.
        clock.advance(Duration::seconds(30));
        for _ in 0..5 {
            assert!(limiter.check("u"));
        }
        assert!(!limiter.check("u"));
    }

    #[test]
    fn rejected_requests_do_not_extend_the_window() {
        let (clock, limiter) = limiter();
        for _ in 0..10 {
            limiter.check("u");
        }
        for _ in 0..50 {
            clock.advance(Duration::seconds(1));
            assert!(!limiter.check("u"));
        }
        clock.advance(Duration::seconds(10));
        assert!(limiter.check("u"));
    }
}
