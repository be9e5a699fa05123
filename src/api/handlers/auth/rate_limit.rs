//! In-memory fixed-window rate limiting for the login endpoint.
//!
//! One counter per client IP. State lives in the server process and resets on
//! restart; for an internal admin tool that tradeoff is acceptable and keeps
//! the login path free of extra database writes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

#[derive(Debug)]
struct AttemptWindow {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window counter keyed by client IP.
///
/// Constructed once at startup and handed to the login route; tests build a
/// fresh instance per case instead of resetting shared state.
#[derive(Debug)]
pub struct LoginRateLimiter {
    max_attempts: u32,
    window: Duration,
    entries: Mutex<HashMap<String, AttemptWindow>>,
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register an attempt from `ip` and decide whether it may proceed.
    ///
    /// A window that has passed its reset point is treated as fresh. Denials
    /// report how many whole seconds remain until the window resets.
    pub fn check(&self, ip: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let entry = entries.entry(ip.to_string()).or_insert(AttemptWindow {
            count: 0,
            reset_at: now + self.window,
        });

        if entry.reset_at <= now {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        if entry.count >= self.max_attempts {
            let remaining = entry.reset_at.saturating_duration_since(now);
            let retry_after_seconds = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return RateLimitDecision::Limited {
                retry_after_seconds: retry_after_seconds.max(1),
            };
        }

        entry.count += 1;
        RateLimitDecision::Allowed
    }

    /// Forget an IP's window. Called after a successful login so earlier
    /// failed attempts stop counting against a legitimate user.
    pub fn clear(&self, ip: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(ip);
    }

    /// Drop windows that have already expired, bounding memory growth.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.reset_at > now);
    }

    #[cfg(test)]
    fn tracked_ips(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Run [`LoginRateLimiter::sweep`] every five minutes until the server exits.
pub fn spawn_sweeper(limiter: std::sync::Arc<LoginRateLimiter>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5 * 60));
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            limiter.sweep();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_attempts_then_limits() {
        let limiter = LoginRateLimiter::new(5, Duration::from_secs(900));
        for _ in 0..5 {
            assert_eq!(limiter.check("10.0.0.1"), RateLimitDecision::Allowed);
        }
        match limiter.check("10.0.0.1") {
            RateLimitDecision::Limited {
                retry_after_seconds,
            } => assert!(retry_after_seconds > 0),
            RateLimitDecision::Allowed => panic!("sixth attempt should be limited"),
        }
    }

    #[test]
    fn counters_are_per_ip() {
        let limiter = LoginRateLimiter::new(1, Duration::from_secs(900));
        assert_eq!(limiter.check("10.0.0.1"), RateLimitDecision::Allowed);
        assert_eq!(limiter.check("10.0.0.2"), RateLimitDecision::Allowed);
        assert!(matches!(
            limiter.check("10.0.0.1"),
            RateLimitDecision::Limited { .. }
        ));
    }

    #[test]
    fn clear_resets_the_counter() {
        let limiter = LoginRateLimiter::new(2, Duration::from_secs(900));
        assert_eq!(limiter.check("10.0.0.1"), RateLimitDecision::Allowed);
        assert_eq!(limiter.check("10.0.0.1"), RateLimitDecision::Allowed);
        assert!(matches!(
            limiter.check("10.0.0.1"),
            RateLimitDecision::Limited { .. }
        ));

        limiter.clear("10.0.0.1");
        assert_eq!(limiter.check("10.0.0.1"), RateLimitDecision::Allowed);
    }

    #[test]
    fn expired_window_starts_fresh() {
        let limiter = LoginRateLimiter::new(1, Duration::from_millis(10));
        assert_eq!(limiter.check("10.0.0.1"), RateLimitDecision::Allowed);
        assert!(matches!(
            limiter.check("10.0.0.1"),
            RateLimitDecision::Limited { .. }
        ));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(limiter.check("10.0.0.1"), RateLimitDecision::Allowed);
    }

    #[test]
    fn sweep_drops_only_expired_windows() {
        let limiter = LoginRateLimiter::new(5, Duration::from_millis(10));
        limiter.check("10.0.0.1");
        std::thread::sleep(Duration::from_millis(20));
        limiter.check("10.0.0.2");

        limiter.sweep();
        assert_eq!(limiter.tracked_ips(), 1);
    }
}
