//! Best-effort rate limiting for recovery-code requests.
//!
//! The limiter is injected through `AppState` so the in-memory default can
//! be swapped for one backed by an external counter store without touching
//! the recovery flow. The default sliding window is process-local and
//! resets on restart; that limitation is accepted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Injected rate-limiter capability, keyed by an arbitrary string (the
/// recovery flow keys by normalized email).
pub trait RateLimiter: Send + Sync {
    /// Records a hit for `key` if allowed and says whether it was.
    fn check(&self, key: &str) -> Decision;
    /// Forgets the key's history (called after a successful password reset).
    fn clear(&self, key: &str);
}

/// Sliding-window limiter: at most `max_hits` hits per `window`, per key.
pub struct SlidingWindowLimiter {
    window: Duration,
    max_hits: usize,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max_hits: usize) -> Self {
        Self {
            window,
            max_hits,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Defaults used by the recovery flow: 3 requests per 15 minutes.
    pub fn recovery_default() -> Self {
        Self::new(Duration::from_secs(15 * 60), 3)
    }

    fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut hits = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Drop keys whose every hit has aged out, otherwise one-off keys
        // (attacker-supplied emails included) accumulate forever.
        hits.retain(|_, times| times.iter().any(|t| now.duration_since(*t) < self.window));
        let entry = hits.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        if entry.len() >= self.max_hits {
            // Oldest surviving hit decides when the caller may retry.
            let oldest = entry[0];
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Decision::Limited { retry_after };
        }
        entry.push(now);
        Decision::Allowed
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    fn clear(&self, key: &str) {
        let mut hits = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        hits.remove(key);
    }
}

/// Whole minutes the caller should wait, rounded up for the 429 payload.
pub fn retry_after_minutes(retry_after: Duration) -> i64 {
    ((retry_after.as_secs() + 59) / 60) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_blocks() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(900), 3);
        let t0 = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.check_at("ana@x.com", t0), Decision::Allowed);
        }
        match limiter.check_at("ana@x.com", t0) {
            Decision::Limited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(900));
            }
            Decision::Allowed => panic!("fourth hit should be limited"),
        }
    }

    #[test]
    fn window_slides() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(900), 3);
        let t0 = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.check_at("ana@x.com", t0), Decision::Allowed);
        }
        // Just past the window the oldest hits fall out.
        let later = t0 + Duration::from_secs(901);
        assert_eq!(limiter.check_at("ana@x.com", later), Decision::Allowed);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(900), 1);
        let t0 = Instant::now();
        assert_eq!(limiter.check_at("a@x.com", t0), Decision::Allowed);
        assert_eq!(limiter.check_at("b@x.com", t0), Decision::Allowed);
        assert!(matches!(
            limiter.check_at("a@x.com", t0),
            Decision::Limited { .. }
        ));
    }

    #[test]
    fn clear_forgets_history() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(900), 1);
        let t0 = Instant::now();
        assert_eq!(limiter.check_at("a@x.com", t0), Decision::Allowed);
        limiter.clear("a@x.com");
        assert_eq!(limiter.check_at("a@x.com", t0), Decision::Allowed);
    }

    #[test]
    fn aged_out_keys_are_evicted() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(900), 3);
        let t0 = Instant::now();
        for i in 0..100 {
            assert_eq!(
                limiter.check_at(&format!("guess-{}@x.com", i), t0),
                Decision::Allowed
            );
        }
        assert_eq!(limiter.tracked_keys(), 100);
        // Any check after the window expires sweeps the dead entries.
        let later = t0 + Duration::from_secs(901);
        assert_eq!(limiter.check_at("ana@x.com", later), Decision::Allowed);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn retry_minutes_round_up() {
        assert_eq!(retry_after_minutes(Duration::from_secs(61)), 2);
        assert_eq!(retry_after_minutes(Duration::from_secs(60)), 1);
        assert_eq!(retry_after_minutes(Duration::from_secs(1)), 1);
    }
}
