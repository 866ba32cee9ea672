//! Exponential backoff with jitter (spec §4.3), grounded on
//! `original_source/NEWVERSION/utils/retry.py::RetryConfig.calculate_delay`
//! but reshaped to the spec's exact formula:
//! `initial_backoff * backoff_factor^attempt + Uniform(0, jitter)`.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial_backoff_secs: f64,
    pub backoff_factor: f64,
    pub jitter_secs: f64,
}

impl BackoffPolicy {
    /// Delay before retry attempt `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff_secs * self.backoff_factor.powi(attempt as i32);
        let jitter = if self.jitter_secs > 0.0 {
            rand::thread_rng().gen_range(0.0..self.jitter_secs)
        } else {
            0.0
        };
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// `max(server Retry-After, computed backoff)` for 429/503 responses
    /// (spec §4.3).
    pub fn delay_for_retry_after(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.delay_for(attempt);
        match retry_after {
            Some(server) => server.max(computed),
            None => computed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_with_attempt() {
        let policy = BackoffPolicy {
            initial_backoff_secs: 0.5,
            backoff_factor: 2.0,
            jitter_secs: 0.0,
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs_f64(0.5));
        assert_eq!(policy.delay_for(1), Duration::from_secs_f64(1.0));
        assert_eq!(policy.delay_for(2), Duration::from_secs_f64(2.0));
    }

    #[test]
    fn retry_after_wins_when_larger_than_backoff() {
        let policy = BackoffPolicy {
            initial_backoff_secs: 0.5,
            backoff_factor: 2.0,
            jitter_secs: 0.0,
        };
        let delay = policy.delay_for_retry_after(0, Some(Duration::from_secs(2)));
        assert_eq!(delay, Duration::from_secs(2));
    }

    #[test]
    fn backoff_wins_when_larger_than_retry_after() {
        let policy = BackoffPolicy {
            initial_backoff_secs: 10.0,
            backoff_factor: 2.0,
            jitter_secs: 0.0,
        };
        let delay = policy.delay_for_retry_after(1, Some(Duration::from_secs(1)));
        assert_eq!(delay, Duration::from_secs_f64(20.0));
    }
}
