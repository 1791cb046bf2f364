//! # Circuit Breaker Module
//!
//! Stops calling the external barcode lookup after repeated failures and lets
//! a single request through again once the reset timeout has elapsed.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::config::LookupConfig;

/// Circuit breaker for external lookups
///
/// ```text
/// CLOSED ──failures ≥ threshold──► OPEN
///    ▲                               │
///    └──────── reset timeout ────────┘
/// ```
///
/// A success resets the failure count; after the reset timeout the counter is
/// cleared and the next request is allowed through.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_timeout: Duration,
}

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a circuit breaker opening after `threshold` consecutive failures
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold,
            reset_timeout,
        }
    }

    /// Create a circuit breaker from the lookup configuration
    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(
            config.circuit_breaker_threshold,
            Duration::from_secs(config.circuit_breaker_reset_secs),
        )
    }

    /// Check if circuit breaker is open (blocking requests)
    ///
    /// Resets to closed once the reset timeout has elapsed since the last failure.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();

        if state.failure_count >= self.threshold {
            if let Some(last_time) = state.last_failure_time {
                if last_time.elapsed() < self.reset_timeout {
                    return true;
                }
                *state = BreakerState::default();
            }
        }
        false
    }

    /// Record a failed lookup
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
    }

    /// Record a successful lookup, clearing previous failures
    pub fn record_success(&self) {
        *self.state.lock() = BreakerState::default();
    }

    /// Current number of consecutive failures
    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(breaker.is_open());
        assert_eq!(breaker.failure_count(), 2);
    }

    #[test]
    fn test_success_resets() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_closes_after_reset_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }
}
