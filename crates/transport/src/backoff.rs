//! Exponential reconnect backoff for the agent leg.
//!
//! The driver leg retries on a fixed timer forever; the agent leg doubles
//! its delay each consecutive failure and gives up after a bounded number
//! of attempts until something external (a page navigation, an explicit
//! reset) asks it to try again.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1000),
            max_attempts: 6,
        }
    }
}

#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the attempt budget is
    /// exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        let delay = self.policy.initial * 2u32.saturating_pow(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// A successful connection resets the failure streak.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }
}
