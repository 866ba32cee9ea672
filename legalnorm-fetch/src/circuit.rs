//! Per-upstream-tag circuit breaker (spec §4.3, §9).
//!
//! Grounded on the `CircuitBreaker`/`CircuitState` shape in
//! `aion-compliance/src/real_http_apis.rs`, generalized to the full
//! three-state transition table the spec requires (that source only
//! ever opens the circuit, never recovers it).

use dashmap::DashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct TagState {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
}

impl Default for TagState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure: None,
        }
    }
}

/// Holds one `TagState` per upstream tag behind a per-tag lock, so
/// concurrent failures on different tags never contend (spec §5, §9).
pub struct CircuitBreaker {
    tags: DashMap<String, Mutex<TagState>>,
    failure_threshold: u32,
    success_threshold: u32,
    open_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, success_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            tags: DashMap::new(),
            failure_threshold,
            success_threshold,
            open_timeout,
        }
    }

    /// Returns true if a call for `tag` may proceed. A side effect is
    /// transitioning `OPEN → HALF_OPEN` once the timeout has elapsed, per
    /// spec §4.3 ("on next call attempt").
    pub fn allow(&self, tag: &str) -> bool {
        let entry = self.tags.entry(tag.to_string()).or_default();
        let mut guard = entry.lock().unwrap();
        match guard.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = guard.last_failure.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= self.open_timeout {
                    guard.state = CircuitState::HalfOpen;
                    guard.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, tag: &str) {
        let entry = self.tags.entry(tag.to_string()).or_default();
        let mut guard = entry.lock().unwrap();
        guard.consecutive_failures = 0;
        match guard.state {
            CircuitState::HalfOpen => {
                guard.consecutive_successes += 1;
                if guard.consecutive_successes >= self.success_threshold {
                    guard.state = CircuitState::Closed;
                    guard.consecutive_successes = 0;
                }
            }
            CircuitState::Closed => {}
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, tag: &str) {
        let entry = self.tags.entry(tag.to_string()).or_default();
        let mut guard = entry.lock().unwrap();
        guard.last_failure = Some(Instant::now());
        match guard.state {
            CircuitState::HalfOpen => {
                guard.state = CircuitState::Open;
                guard.consecutive_successes = 0;
            }
            CircuitState::Closed => {
                guard.consecutive_failures += 1;
                if guard.consecutive_failures >= self.failure_threshold {
                    guard.state = CircuitState::Open;
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self, tag: &str) -> CircuitState {
        self.tags.entry(tag.to_string()).or_default().lock().unwrap().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let cb = CircuitBreaker::new(3, 2, Duration::from_secs(60));
        for _ in 0..2 {
            cb.record_failure("normattiva");
        }
        assert_eq!(cb.state("normattiva"), CircuitState::Closed);
        cb.record_failure("normattiva");
        assert_eq!(cb.state("normattiva"), CircuitState::Open);
        assert!(!cb.allow("normattiva"));
    }

    #[test]
    fn half_open_recovers_to_closed_after_success_threshold() {
        let cb = CircuitBreaker::new(1, 2, Duration::from_millis(10));
        cb.record_failure("eurlex");
        assert_eq!(cb.state("eurlex"), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow("eurlex"));
        assert_eq!(cb.state("eurlex"), CircuitState::HalfOpen);
        cb.record_success("eurlex");
        assert_eq!(cb.state("eurlex"), CircuitState::HalfOpen);
        cb.record_success("eurlex");
        assert_eq!(cb.state("eurlex"), CircuitState::Closed);
    }

    #[test]
    fn half_open_reopens_on_any_failure() {
        let cb = CircuitBreaker::new(1, 2, Duration::from_millis(10));
        cb.record_failure("brocardi");
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow("brocardi"));
        cb.record_failure("brocardi");
        assert_eq!(cb.state("brocardi"), CircuitState::Open);
    }

    #[test]
    fn independent_tags_do_not_interfere() {
        let cb = CircuitBreaker::new(1, 2, Duration::from_secs(60));
        cb.record_failure("normattiva");
        assert_eq!(cb.state("normattiva"), CircuitState::Open);
        assert_eq!(cb.state("eurlex"), CircuitState::Closed);
    }
}
