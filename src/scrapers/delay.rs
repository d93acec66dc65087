use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Inclusive millisecond range a pause is drawn from
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::none()
    }
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn none() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    fn sample(&self) -> Duration {
        let upper = self.max_ms.max(self.min_ms);
        if upper == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=upper);
        Duration::from_millis(ms)
    }

    pub async fn wait(&self) {
        let duration = self.sample();
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Thread-blocking variant for the browser's blocking call path.
    pub fn wait_blocking(&self) {
        let duration = self.sample();
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Pacing between requests so traffic resembles a person browsing
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayPolicy {
    /// Before each HTTP page request
    pub before_request: DelayRange,
    /// Between consecutive HTTP result pages
    pub between_pages: DelayRange,
    /// After a browser navigation, waiting for scripts to render listings
    pub page_settle: DelayRange,
    /// Between consecutive browser result pages
    pub browser_paging: DelayRange,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            before_request: DelayRange::new(1_000, 3_000),
            between_pages: DelayRange::new(2_000, 5_000),
            page_settle: DelayRange::new(3_000, 5_000),
            browser_paging: DelayRange::new(4_000, 7_000),
        }
    }
}

impl DelayPolicy {
    /// All-zero pauses, for tests.
    pub fn none() -> Self {
        Self {
            before_request: DelayRange::none(),
            between_pages: DelayRange::none(),
            page_settle: DelayRange::none(),
            browser_paging: DelayRange::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stays_inside_range() {
        let range = DelayRange::new(5, 10);
        for _ in 0..50 {
            let duration = range.sample();
            assert!(duration >= Duration::from_millis(5));
            assert!(duration <= Duration::from_millis(10));
        }
    }

    #[test]
    fn zero_range_never_sleeps() {
        assert_eq!(DelayRange::none().sample(), Duration::ZERO);
    }

    #[test]
    fn degenerate_range_uses_larger_bound() {
        let range = DelayRange { min_ms: 10, max_ms: 0 };
        let duration = range.sample();
        assert!(duration <= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn zero_policy_returns_immediately() {
        let policy = DelayPolicy::none();
        policy.before_request.wait().await;
        policy.between_pages.wait().await;
    }

    #[test]
    fn partial_range_override_still_deserializes() {
        let policy: DelayPolicy =
            serde_json::from_str(r#"{"between_pages": {"min_ms": 100}}"#).unwrap();

        assert_eq!(policy.between_pages.min_ms, 100);
        assert_eq!(policy.between_pages.max_ms, 0);
        // untouched phases keep their stock ranges
        assert_eq!(policy.before_request.min_ms, 1_000);
        assert_eq!(policy.before_request.max_ms, 3_000);
    }
}
