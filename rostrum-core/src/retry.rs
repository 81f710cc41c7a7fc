//! A reusable backoff policy for polling slow external state.
//!
//! The deposit service settles asynchronously, so callers poll its status
//! endpoint. Every caller shares this one policy type instead of growing its
//! own ad hoc loop; the schedule (start, growth factor, per-step cap,
//! overall budget) is data, configurable alongside everything else.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An exponential backoff schedule with a per-step cap and an overall
/// time budget.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// The first delay
    #[serde(with = "humantime_serde")]
    pub start: Duration,

    /// Multiplier applied to the delay after each attempt
    pub factor: f64,

    /// No single delay exceeds this
    #[serde(with = "humantime_serde")]
    pub cap: Duration,

    /// Total sleep budget; iteration stops once it is spent. A poll that is
    /// still inconclusive at this point is a retryable failure for the
    /// caller, never a permanent one.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            start: Duration::from_millis(1500),
            factor: 1.25,
            cap: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// The successive delays of this schedule. The final delay is clamped
    /// so the delays sum exactly to `timeout`.
    pub fn delays(&self) -> Delays {
        Delays {
            next: self.start.min(self.cap),
            factor: self.factor.max(1.0),
            cap: self.cap,
            remaining: self.timeout,
        }
    }
}

/// Iterator over the delays of a [`BackoffPolicy`].
#[derive(Clone, Debug)]
pub struct Delays {
    next: Duration,
    factor: f64,
    cap: Duration,
    remaining: Duration,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining.is_zero() {
            return None;
        }
        let delay = self.next.min(self.remaining);
        self.remaining -= delay;
        self.next = self.next.mul_f64(self.factor).min(self.cap);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_grows_to_cap_within_budget() {
        let policy = BackoffPolicy::default();
        let delays: Vec<_> = policy.delays().collect();

        assert_eq!(delays[0], Duration::from_millis(1500));
        assert_eq!(delays[1], Duration::from_micros(1_875_000));

        // non-decreasing, each step within the cap
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0] || pair[1] == *delays.last().unwrap());
            assert!(pair[0] <= policy.cap);
        }

        // the budget is spent exactly
        let total: Duration = delays.iter().sum();
        assert_eq!(total, policy.timeout);
    }

    #[test]
    fn degenerate_factor_never_shrinks() {
        let policy = BackoffPolicy {
            start: Duration::from_secs(1),
            factor: 0.5,
            cap: Duration::from_secs(5),
            timeout: Duration::from_secs(3),
        };
        let delays: Vec<_> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(1),
                Duration::from_secs(1)
            ]
        );
    }

    #[test]
    fn zero_budget_yields_nothing() {
        let policy = BackoffPolicy {
            timeout: Duration::ZERO,
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.delays().count(), 0);
    }
}
