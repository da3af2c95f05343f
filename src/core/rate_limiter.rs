//! Sliding-window request limiter
//!
//! Tracks the send time of every request in the current window and holds
//! new requests back once the window is full. The first response carrying
//! `X-Ratelimit-*` headers seeds the window with requests the server had
//! already counted before this process started.

use crate::core::constants::header;
use reqwest::header::HeaderMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Rate-limit accounting reported by the server
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitStatus {
    /// Requests used in the current server window, including this one
    pub used: u64,
    /// Requests left in the current server window
    pub remaining: f64,
    /// Time until the server window resets
    pub reset: Duration,
}

impl RateLimitStatus {
    /// Parse the rate-limit headers, returning `None` if any is absent or
    /// malformed
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let number = |name: &str| -> Option<f64> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
        };

        let used = number(header::RATELIMIT_USED)?;
        let remaining = number(header::RATELIMIT_REMAINING)?;
        let reset = number(header::RATELIMIT_RESET)?;

        Some(Self {
            used: used.max(0.0) as u64,
            remaining,
            reset: Duration::from_secs(reset.max(0.0) as u64),
        })
    }
}

/// Client-side sliding window over request send times
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    poll_interval: Duration,
    /// Front is the oldest request
    history: VecDeque<Instant>,
    seeded: bool,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize, poll_interval: Duration) -> Self {
        Self {
            window,
            max_requests: max_requests.max(1),
            poll_interval,
            history: VecDeque::with_capacity(max_requests.max(1)),
            seeded: false,
        }
    }

    /// Number of requests currently counted against the window
    pub fn in_window(&self) -> usize {
        self.history.len()
    }

    /// Drop requests that have aged out of the window
    pub fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.history.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time to wait before another request may be sent, or `None` if one
    /// may be sent now
    pub fn wait_time(&mut self, now: Instant) -> Option<Duration> {
        self.evict(now);
        if self.history.len() < self.max_requests {
            return None;
        }
        let oldest = *self.history.front()?;
        Some(
            self.window
                .saturating_sub(now.saturating_duration_since(oldest)),
        )
    }

    /// Count a request sent at `now`
    pub fn record(&mut self, now: Instant) {
        self.history.push_back(now);
        while self.history.len() > self.max_requests {
            self.history.pop_front();
        }
    }

    /// Fold server-reported usage into the window
    ///
    /// Only the first report is used. Requests the server counted before
    /// ours are backdated so they expire when the server window resets.
    pub fn observe(&mut self, now: Instant, status: &RateLimitStatus) {
        if self.seeded {
            return;
        }
        self.seeded = true;

        if status.used <= 1 {
            return;
        }

        info!(
            used = status.used,
            remaining = status.remaining,
            reset_secs = status.reset.as_secs(),
            "Catching up on rate-limit usage from earlier sessions"
        );

        let reset = status.reset.min(self.window);
        let backdated = now
            .checked_sub(self.window - reset)
            .unwrap_or(now);
        // Anything past a full window would be trimmed right away.
        let prior = usize::try_from(status.used - 1)
            .unwrap_or(usize::MAX)
            .min(self.max_requests);
        for _ in 0..prior {
            self.history.push_front(backdated);
        }
        self.history.make_contiguous().sort();
        while self.history.len() > self.max_requests {
            self.history.pop_front();
        }
    }

    /// Wait until the window has room, then count one request
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            match self.wait_time(now) {
                None => {
                    self.record(now);
                    return;
                }
                Some(wait) => {
                    info!(
                        window_secs = self.window.as_secs(),
                        wait_secs = wait.as_secs(),
                        "Request window full, waiting"
                    );
                    let step = wait.min(self.poll_interval).max(Duration::from_millis(1));
                    tokio::time::sleep(step).await;
                }
            }
        }
    }

    /// Update the window from response headers
    pub fn observe_headers(&mut self, headers: &HeaderMap) {
        match RateLimitStatus::from_headers(headers) {
            Some(status) => {
                debug!(
                    used = status.used,
                    remaining = status.remaining,
                    reset_secs = status.reset.as_secs(),
                    "Rate-limit headers"
                );
                self.observe(Instant::now(), &status);
            }
            None => debug!("No rate-limit info available for this response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn limiter(window_secs: u64, max: usize) -> RateLimiter {
        RateLimiter::new(Duration::from_secs(window_secs), max, Duration::from_secs(1))
    }

    #[test]
    fn test_allows_until_full() {
        let mut limiter = limiter(60, 3);
        let start = Instant::now();
        for i in 0..3 {
            let now = start + Duration::from_secs(i);
            assert_eq!(limiter.wait_time(now), None);
            limiter.record(now);
        }
        let now = start + Duration::from_secs(10);
        assert_eq!(limiter.wait_time(now), Some(Duration::from_secs(50)));
    }

    #[test]
    fn test_old_requests_expire() {
        let mut limiter = limiter(60, 2);
        let start = Instant::now();
        limiter.record(start);
        limiter.record(start + Duration::from_secs(30));
        assert!(limiter.wait_time(start + Duration::from_secs(59)).is_some());
        assert_eq!(limiter.wait_time(start + Duration::from_secs(60)), None);
        assert_eq!(limiter.in_window(), 1);
    }

    #[test]
    fn test_history_never_exceeds_max() {
        let mut limiter = limiter(60, 2);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.record(start);
        }
        assert_eq!(limiter.in_window(), 2);
    }

    #[test]
    fn test_observe_seeds_prior_usage_once() {
        let mut limiter = limiter(600, 1000);
        let start = Instant::now() + Duration::from_secs(1000);
        limiter.record(start);
        let status = RateLimitStatus {
            used: 11,
            remaining: 989.0,
            reset: Duration::from_secs(120),
        };
        limiter.observe(start, &status);
        assert_eq!(limiter.in_window(), 11);

        // Seeded requests drain when the server window resets.
        limiter.evict(start + Duration::from_secs(119));
        assert_eq!(limiter.in_window(), 11);
        limiter.evict(start + Duration::from_secs(120));
        assert_eq!(limiter.in_window(), 1);

        limiter.observe(start, &status);
        assert_eq!(limiter.in_window(), 1);
    }

    #[test]
    fn test_observe_ignores_fresh_session() {
        let mut limiter = limiter(600, 1000);
        let now = Instant::now();
        limiter.record(now);
        limiter.observe(
            now,
            &RateLimitStatus {
                used: 1,
                remaining: 999.0,
                reset: Duration::from_secs(500),
            },
        );
        assert_eq!(limiter.in_window(), 1);
    }

    #[test]
    fn test_status_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-used", HeaderValue::from_static("4"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("996.0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("321"));
        let status = RateLimitStatus::from_headers(&headers).unwrap();
        assert_eq!(status.used, 4);
        assert_eq!(status.remaining, 996.0);
        assert_eq!(status.reset, Duration::from_secs(321));
    }

    #[test]
    fn test_status_missing_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-used", HeaderValue::from_static("4"));
        assert!(RateLimitStatus::from_headers(&headers).is_none());
    }

    #[tokio::test]
    async fn test_acquire_records_request() {
        let mut limiter = limiter(60, 5);
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.in_window(), 2);
    }

    #[test]
    fn test_observe_caps_huge_usage_report() {
        let mut limiter = limiter(600, 10);
        let now = Instant::now() + Duration::from_secs(1000);
        limiter.record(now);
        limiter.observe(
            now,
            &RateLimitStatus {
                used: 20_000_000,
                remaining: 0.0,
                reset: Duration::from_secs(300),
            },
        );
        assert_eq!(limiter.in_window(), 10);
        assert!(limiter.history.capacity() < 1000);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_full_window() {
        let mut limiter = RateLimiter::new(
            Duration::from_secs(1),
            2,
            Duration::from_millis(50),
        );
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(limiter.in_window() >= 1);
    }
}
