//! In-memory fixed-window rate limiter
//!
//! State lives for the lifetime of the limiter and is never persisted; a
//! restart resets every window. Elapsed windows are dropped whenever the
//! number of tracked identifiers reaches the prune threshold, which then
//! doubles with the live set so each `check` stays amortized O(1).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use crate::clock::{duration_millis, Clock, SystemClock};

/// Tracked identifiers before `check` first drops elapsed windows
pub const DEFAULT_PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: i64,
}

/// Per-identifier request counter with a fixed time window
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, Window>>,
    prune_floor: usize,
    prune_at: AtomicUsize,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    pub fn with_clock<C: Clock + 'static>(max_requests: u32, window: Duration, clock: Arc<C>) -> Self {
        Self {
            max_requests,
            window,
            clock,
            windows: Mutex::new(HashMap::new()),
            prune_floor: DEFAULT_PRUNE_THRESHOLD,
            prune_at: AtomicUsize::new(DEFAULT_PRUNE_THRESHOLD),
        }
    }

    /// Prune elapsed windows once this many identifiers are tracked
    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        self.prune_floor = threshold;
        self.prune_at = AtomicUsize::new(threshold);
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        // Counters stay valid even if a holder panicked
        self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn window_elapsed(&self, window: &Window, now: i64) -> bool {
        now.saturating_sub(window.started_at) >= duration_millis(self.window)
    }

    fn drop_elapsed(&self, windows: &mut HashMap<String, Window>, now: i64) -> usize {
        let before = windows.len();
        let window = duration_millis(self.window);
        windows.retain(|_, w| now.saturating_sub(w.started_at) < window);
        before - windows.len()
    }

    /// Count one request for `identifier`; `true` while it is within the limit
    pub fn check(&self, identifier: &str) -> bool {
        let now = self.clock.now_millis();
        let mut windows = self.lock();

        // Only new identifiers grow the map
        if !windows.contains_key(identifier)
            && windows.len() >= self.prune_at.load(Ordering::Relaxed)
        {
            let dropped = self.drop_elapsed(&mut windows, now);
            let next = self.prune_floor.max(windows.len().saturating_mul(2));
            self.prune_at.store(next, Ordering::Relaxed);
            debug!("Pruned {} elapsed rate limit windows, next prune at {}", dropped, next);
        }

        let window = windows
            .entry(identifier.to_string())
            .or_insert(Window {
                count: 0,
                started_at: now,
            });

        if self.window_elapsed(window, now) {
            *window = Window {
                count: 0,
                started_at: now,
            };
        }

        window.count = window.count.saturating_add(1);
        let allowed = window.count <= self.max_requests;
        if !allowed {
            debug!(
                "Rate limit hit for {}: {} requests in window",
                identifier, window.count
            );
        }
        allowed
    }

    /// Requests left in the current window
    pub fn remaining(&self, identifier: &str) -> u32 {
        let now = self.clock.now_millis();
        match self.lock().get(identifier) {
            Some(window) if !self.window_elapsed(window, now) => {
                self.max_requests.saturating_sub(window.count)
            }
            _ => self.max_requests,
        }
    }

    /// Time until the window resets, if `identifier` is currently limited
    pub fn retry_after(&self, identifier: &str) -> Option<Duration> {
        let now = self.clock.now_millis();
        let windows = self.lock();
        let window = windows.get(identifier)?;

        if window.count < self.max_requests || self.window_elapsed(window, now) {
            return None;
        }

        let reset_at = window.started_at.saturating_add(duration_millis(self.window));
        let wait = u64::try_from(reset_at.saturating_sub(now)).unwrap_or(0);
        Some(Duration::from_millis(wait))
    }

    pub fn reset(&self, identifier: &str) {
        self.lock().remove(identifier);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drop identifiers whose window has elapsed; returns how many were dropped
    pub fn prune(&self) -> usize {
        let now = self.clock.now_millis();
        let mut windows = self.lock();
        self.drop_elapsed(&mut windows, now)
    }

    pub fn tracked(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(max: u32, window_secs: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::with_clock(max, Duration::from_secs(window_secs), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_allows_up_to_limit() {
        let (limiter, _) = limiter(3, 60);

        assert!(limiter.check("login:alice"));
        assert!(limiter.check("login:alice"));
        assert!(limiter.check("login:alice"));
        assert!(!limiter.check("login:alice"));
        assert_eq!(limiter.remaining("login:alice"), 0);
    }

    #[test]
    fn test_window_resets() {
        let (limiter, clock) = limiter(1, 60);

        assert!(limiter.check("ai:summary"));
        assert!(!limiter.check("ai:summary"));

        clock.advance(Duration::from_secs(59));
        assert!(!limiter.check("ai:summary"));

        clock.advance(Duration::from_secs(1));
        assert!(limiter.check("ai:summary"));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (limiter, _) = limiter(1, 60);

        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
        assert_eq!(limiter.remaining("c"), 1);
    }

    #[test]
    fn test_retry_after() {
        let (limiter, clock) = limiter(2, 10);

        limiter.check("x");
        assert_eq!(limiter.retry_after("x"), None);
        limiter.check("x");

        clock.advance(Duration::from_secs(4));
        assert_eq!(limiter.retry_after("x"), Some(Duration::from_secs(6)));

        clock.advance(Duration::from_secs(6));
        assert_eq!(limiter.retry_after("x"), None);
    }

    #[test]
    fn test_reset_and_prune() {
        let (limiter, clock) = limiter(1, 10);

        limiter.check("a");
        limiter.check("b");
        limiter.reset("a");
        assert!(limiter.check("a"));

        clock.advance(Duration::from_secs(10));
        limiter.check("c");
        assert_eq!(limiter.prune(), 2);
        assert_eq!(limiter.tracked(), 1);

        limiter.clear();
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn test_check_prunes_elapsed_windows() {
        let (limiter, clock) = limiter(1, 10);
        let limiter = limiter.with_prune_threshold(4);

        for id in ["a", "b", "c", "d"] {
            limiter.check(id);
        }
        assert_eq!(limiter.tracked(), 4);

        clock.advance(Duration::from_secs(10));
        assert!(limiter.check("e"));
        assert_eq!(limiter.tracked(), 1);

        // Live windows survive and push the threshold up
        for id in ["f", "g", "h", "i"] {
            limiter.check(id);
        }
        assert_eq!(limiter.tracked(), 5);
        assert!(!limiter.check("e"));
        assert_eq!(limiter.remaining("i"), 0);
    }
}
