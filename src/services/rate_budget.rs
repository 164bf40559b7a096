//! Request spacing for the document service.
//!
//! A [`RateBudget`] enforces a minimum interval between the *issue* times of
//! consecutive requests. With a ceiling of `R` requests per second the
//! interval is `1 / R`, so any one-second window sees at most `R` issues
//! (one more when both window edges land exactly on an issue).
//!
//! The budget reads time through `tokio::time`, so tests drive it with the
//! paused runtime clock instead of real sleeps.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::validate_rate;

/// Shared spacing state for one run.
#[derive(Debug)]
pub struct RateBudget {
    min_interval: Duration,
    last_issue: Mutex<Option<Instant>>,
}

impl RateBudget {
    /// Budget allowing at most `max_requests_per_second` issues per second.
    pub fn per_second(max_requests_per_second: f64) -> Result<Self> {
        validate_rate(max_requests_per_second)?;
        let min_interval = Duration::try_from_secs_f64(1.0 / max_requests_per_second)
            .map_err(|e| {
                AppError::validation(format!(
                    "max requests per second {max_requests_per_second} is too small: {e}"
                ))
            })?;
        Ok(Self::with_interval(min_interval))
    }

    /// Budget with an explicit spacing between issues.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_issue: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request may be issued and claim that slot.
    ///
    /// Returns the issue instant. The caller must send its request right
    /// away. The lock is held across the wait, so concurrent callers are
    /// served one at a time in arrival order and never judged eligible
    /// against the same previous issue.
    pub async fn acquire(&self) -> Instant {
        let mut last_issue = self.last_issue.lock().await;
        if let Some(previous) = *last_issue {
            tokio::time::sleep_until(previous + self.min_interval).await;
        }
        let now = Instant::now();
        *last_issue = Some(now);
        now
    }

    /// Issue instant of the most recent request, if any.
    pub async fn last_issue(&self) -> Option<Instant> {
        *self.last_issue.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_inverse_of_rate() {
        let budget = RateBudget::per_second(4.0).unwrap();
        assert_eq!(budget.min_interval(), Duration::from_millis(250));

        let budget = RateBudget::per_second(0.5).unwrap();
        assert_eq!(budget.min_interval(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_unusable_rates() {
        assert!(RateBudget::per_second(0.0).is_err());
        assert!(RateBudget::per_second(-3.0).is_err());
        assert!(RateBudget::per_second(f64::NAN).is_err());
        assert!(RateBudget::per_second(1e-300).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn first_issue_is_immediate() {
        let budget = RateBudget::per_second(1.0).unwrap();
        let start = Instant::now();
        let issued = budget.acquire().await;
        assert_eq!(issued, start);
        assert_eq!(budget.last_issue().await, Some(issued));
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_issues_are_spaced() {
        let budget = RateBudget::per_second(4.0).unwrap();
        let mut issued = Vec::new();
        for _ in 0..6 {
            issued.push(budget.acquire().await);
        }
        for pair in issued.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rolling_window_never_exceeds_ceiling() {
        let rate = 10;
        let budget = RateBudget::per_second(f64::from(rate)).unwrap();
        let mut issued = Vec::new();
        for _ in 0..35 {
            issued.push(budget.acquire().await);
        }
        // R + 1 issues always span at least one second
        let span = usize::try_from(rate).unwrap();
        for window in issued.windows(span + 1) {
            assert!(window[span] - window[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_response_does_not_compound_delay() {
        let budget = RateBudget::per_second(2.0).unwrap();
        let first = budget.acquire().await;
        // a response that takes longer than the interval
        tokio::time::sleep(Duration::from_secs(3)).await;
        let second = budget.acquire().await;
        let gap = second - first;
        assert!(gap >= Duration::from_secs(3));
        assert!(gap < Duration::from_millis(3_010));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_response_still_waits_for_interval() {
        let budget = RateBudget::per_second(2.0).unwrap();
        let first = budget.acquire().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = budget.acquire().await;
        assert!(second - first >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let budget = RateBudget::per_second(5.0).unwrap();
        let (a, b, c) = tokio::join!(budget.acquire(), budget.acquire(), budget.acquire());
        let mut issued = [a, b, c];
        issued.sort();
        assert!(issued[1] - issued[0] >= Duration::from_millis(200));
        assert!(issued[2] - issued[1] >= Duration::from_millis(200));
    }
}
