//! [`RestartPolicy`] – bounded restart with exponential backoff.
//!
//! A supervisor records every failed run with [`RestartBudget::record_failure`]
//! and gets back either the delay to wait before re-entering the loop or the
//! verdict that the budget is spent.
//!
//! | Run outcome                                 | Effect on the budget       |
//! |---------------------------------------------|----------------------------|
//! | failed after less than `stable_after_ms`    | attempt count + 1          |
//! | failed after at least `stable_after_ms`     | count reset, then + 1      |
//! | count already at `max_restarts`             | [`RestartDecision::GiveUp`]|
//!
//! The delay doubles with every consecutive attempt, starting at
//! `initial_backoff_ms` and capped at `max_backoff_ms`.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use simbridge_kernel::{RestartBudget, RestartDecision, RestartPolicy};
//!
//! let policy = RestartPolicy { max_restarts: Some(2), ..RestartPolicy::default() };
//! let mut budget = RestartBudget::new(policy);
//!
//! assert!(matches!(budget.record_failure(Duration::ZERO), RestartDecision::Retry { attempt: 1, .. }));
//! assert!(matches!(budget.record_failure(Duration::ZERO), RestartDecision::Retry { attempt: 2, .. }));
//! assert_eq!(budget.record_failure(Duration::ZERO), RestartDecision::GiveUp { attempts: 2 });
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use simbridge_types::BridgeError;
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────────────────────────────────────

/// How often, and how quickly, a failed loop may be re-entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    /// Consecutive restarts allowed before giving up.  `None` retries forever.
    pub max_restarts: Option<u32>,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// A run lasting at least this long wipes the attempt count.
    pub stable_after_ms: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: Some(10),
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
            stable_after_ms: 30_000,
        }
    }
}

impl RestartPolicy {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn stable_after(&self) -> Duration {
        Duration::from_millis(self.stable_after_ms)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(BridgeError::Config(format!(
                "restart.initial_backoff_ms ({}) exceeds restart.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Budget
// ────────────────────────────────────────────────────────────────────────────

/// What the supervisor should do after a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Wait `delay`, then start attempt number `attempt` (1-based).
    Retry { attempt: u32, delay: Duration },
    /// The budget is spent after `attempts` restarts.
    GiveUp { attempts: u32 },
}

/// Running attempt count against a [`RestartPolicy`].
#[derive(Debug, Clone)]
pub struct RestartBudget {
    policy: RestartPolicy,
    attempts: u32,
}

impl RestartBudget {
    pub fn new(policy: RestartPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Consecutive restarts granted so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    /// Record a run that failed after `ran_for` and decide what happens next.
    pub fn record_failure(&mut self, ran_for: Duration) -> RestartDecision {
        if ran_for >= self.policy.stable_after() && self.attempts > 0 {
            debug!(previous_attempts = self.attempts, "run was stable, restart count reset");
            self.attempts = 0;
        }
        if let Some(max) = self.policy.max_restarts
            && self.attempts >= max
        {
            return RestartDecision::GiveUp {
                attempts: self.attempts,
            };
        }
        self.attempts += 1;
        RestartDecision::Retry {
            attempt: self.attempts,
            delay: self.backoff(self.attempts),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let max = self.policy.max_backoff();
        self.policy
            .initial_backoff()
            .checked_mul(factor)
            .map_or(max, |delay| delay.min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> Duration {
        Duration::from_millis(1)
    }

    #[test]
    fn delays_double_up_to_the_cap() {
        let mut budget = RestartBudget::new(RestartPolicy {
            max_restarts: None,
            ..RestartPolicy::default()
        });
        let delays: Vec<u64> = (0..8)
            .map(|_| match budget.record_failure(quick()) {
                RestartDecision::Retry { delay, .. } => delay.as_millis() as u64,
                RestartDecision::GiveUp { .. } => panic!("unbounded policy gave up"),
            })
            .collect();
        assert_eq!(delays, [100, 200, 400, 800, 1600, 3200, 5000, 5000]);
    }

    #[test]
    fn gives_up_after_max_restarts() {
        let mut budget = RestartBudget::new(RestartPolicy::default());
        for expected in 1..=10 {
            match budget.record_failure(quick()) {
                RestartDecision::Retry { attempt, .. } => assert_eq!(attempt, expected),
                RestartDecision::GiveUp { .. } => panic!("gave up early at {expected}"),
            }
        }
        assert_eq!(
            budget.record_failure(quick()),
            RestartDecision::GiveUp { attempts: 10 }
        );
    }

    #[test]
    fn zero_restarts_gives_up_immediately() {
        let mut budget = RestartBudget::new(RestartPolicy {
            max_restarts: Some(0),
            ..RestartPolicy::default()
        });
        assert_eq!(
            budget.record_failure(quick()),
            RestartDecision::GiveUp { attempts: 0 }
        );
    }

    #[test]
    fn stable_run_resets_the_count() {
        let mut budget = RestartBudget::new(RestartPolicy {
            max_restarts: Some(2),
            ..RestartPolicy::default()
        });
        budget.record_failure(quick());
        budget.record_failure(quick());
        assert_eq!(budget.attempts(), 2);

        let decision = budget.record_failure(Duration::from_secs(30));
        assert_eq!(
            decision,
            RestartDecision::Retry {
                attempt: 1,
                delay: Duration::from_millis(100)
            }
        );
    }

    #[test]
    fn huge_attempt_counts_saturate_at_the_cap() {
        let budget = RestartBudget::new(RestartPolicy::default());
        assert_eq!(budget.backoff(64), Duration::from_secs(5));
        assert_eq!(budget.backoff(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn validate_rejects_inverted_backoff() {
        let policy = RestartPolicy {
            initial_backoff_ms: 10_000,
            ..RestartPolicy::default()
        };
        assert!(matches!(policy.validate(), Err(BridgeError::Config(_))));
        RestartPolicy::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let policy: RestartPolicy = toml::from_str("max_restarts = 3").unwrap();
        assert_eq!(policy.max_restarts, Some(3));
        assert_eq!(policy.max_backoff_ms, 5_000);
    }
}
