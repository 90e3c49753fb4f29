//! Minimum-interval rate limiting for outgoing requests

use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Enforces a minimum gap between two consecutive requests
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Get time until next request is allowed
    #[must_use]
    pub fn time_until_next_request(&self) -> Duration {
        match self.last_request {
            Some(last) => self.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Wait out the remainder of the interval, then record a request.
    pub async fn acquire(&mut self) {
        let wait = self.time_until_next_request();
        if !wait.is_zero() {
            tracing::debug!("Rate limit: waiting {:.3}s", wait.as_secs_f64());
            sleep(wait).await;
        }
        self.last_request = Some(Instant::now());
    }
}
