//! Rate limiter for Sheets API calls.
//!
//! Enforces a minimum interval between requests and honours the
//! `Retry-After` hint of HTTP 429 responses.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Rate limiter that enforces minimum intervals between operations.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between allowed operations.
    min_interval: Duration,

    /// Earliest instant the next operation may start.
    next_allowed: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(None),
        }
    }

    /// Creates a rate limiter from milliseconds.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Waits until an operation is allowed, then reserves the next slot.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut next = self.next_allowed.lock().await;

        let wait_duration = next
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or_default();

        if !wait_duration.is_zero() {
            debug!(
                "Rate limiter: waiting {:?} before next operation",
                wait_duration
            );
            tokio::time::sleep(wait_duration).await;
        }

        *next = Some(Instant::now() + self.min_interval);
        wait_duration
    }

    /// Returns the time remaining until the next operation is allowed.
    pub async fn time_until_allowed(&self) -> Duration {
        self.next_allowed
            .lock()
            .await
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or_default()
    }

    /// Pushes the next allowed slot back after a 429 response.
    pub async fn handle_retry_after(&self, wait_seconds: u64) {
        warn!(
            "Received rate limit from Sheets API: retry after {} seconds",
            wait_seconds
        );

        let blocked_until = Instant::now() + Duration::from_secs(wait_seconds);
        let mut next = self.next_allowed.lock().await;
        if next.is_none_or(|at| at < blocked_until) {
            *next = Some(blocked_until);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_first_operation() {
        let limiter = RateLimiter::from_millis(1000);
        assert_eq!(limiter.time_until_allowed().await, Duration::ZERO);

        let waited = limiter.wait_and_acquire().await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_rate_limiter_subsequent_operation() {
        let limiter = RateLimiter::new(Duration::from_millis(100));

        limiter.wait_and_acquire().await;

        let remaining = limiter.time_until_allowed().await;
        assert!(remaining > Duration::ZERO);

        let waited = limiter.wait_and_acquire().await;
        assert!(waited > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retry_after_extends_wait() {
        let limiter = RateLimiter::new(Duration::from_millis(10));
        limiter.handle_retry_after(30).await;

        let remaining = limiter.time_until_allowed().await;
        assert!(remaining > Duration::from_secs(29));
    }
}
