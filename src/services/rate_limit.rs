//! Sliding-window rate limiting for outbound requests.
//!
//! One limiter instance is shared by every caller that talks to the remote
//! side. Listing calls are exempt; per-article and per-image fetches always
//! go through `admit`.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Shared sliding-window rate limiter.
///
/// The whole evict-check-wait-append sequence runs under one async mutex, so
/// two waiters can never both claim the single slot that frees up when the
/// oldest timestamp ages out of the window.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until a request slot is available, then claim it.
    ///
    /// Returns the time spent waiting, for logging.
    pub async fn admit(&self) -> Duration {
        let mut admissions = self.admissions.lock().await;
        let mut now = Instant::now();

        while let Some(&oldest) = admissions.front() {
            if now.duration_since(oldest) >= self.window {
                admissions.pop_front();
            } else {
                break;
            }
        }

        let mut waited = Duration::ZERO;
        if admissions.len() >= self.max_requests {
            let oldest = *admissions.front().expect("queue is non-empty");
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            if !wait.is_zero() {
                log::debug!("Rate limit reached, waiting {:.1}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
                waited = wait;
                now = Instant::now();
            }
            admissions.pop_front();
        }

        admissions.push_back(now);
        waited
    }
}
