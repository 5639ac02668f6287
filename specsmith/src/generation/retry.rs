//! Backoff schedule for transient generation failures.
//!
//! The client retries network errors, server errors and timeouts with
//! capped exponential backoff. Parameter negotiation does not pass through
//! here.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^retry
    #[default]
    Exponential,
    /// delay = base * (retry + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// Jitter strategy to spread concurrent retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum backend calls per request (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay between retries in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter_strategy: JitterStrategy,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::None,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }

    /// A config that never sleeps. Intended for tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::default()
            .with_max_attempts(max_attempts)
            .with_base_delay_ms(0)
            .with_max_delay_ms(0)
    }
}

/// Per-request retry bookkeeping.
///
/// Lives on the stack of a single `generate` call, so concurrent requests
/// never share it.
#[derive(Debug, Default)]
pub struct RetryState {
    /// Backoff retries taken so far.
    pub retries: u32,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if another backoff attempt is allowed.
    #[must_use]
    pub fn can_retry(&self, config: &RetryConfig) -> bool {
        self.retries + 1 < config.max_attempts.max(1)
    }

    /// Calculates the delay before the next retry and records it.
    pub fn next_delay(&mut self, config: &RetryConfig) -> Duration {
        let delay = calculate_delay(self.retries, config);
        self.retries += 1;
        delay
    }
}

/// Calculates the delay for the given zero-based retry number.
#[must_use]
pub fn calculate_delay(retry: u32, config: &RetryConfig) -> Duration {
    let base = config.base_delay_ms;
    let max = config.max_delay_ms;

    let delay = match config.backoff_strategy {
        BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(retry)).min(max),
        BackoffStrategy::Linear => base.saturating_mul(u64::from(retry) + 1).min(max),
        BackoffStrategy::Constant => base.min(max),
    };

    let jittered = match config.jitter_strategy {
        JitterStrategy::None => delay,
        JitterStrategy::Full => {
            if delay == 0 {
                0
            } else {
                rand::thread_rng().gen_range(0..=delay)
            }
        }
        JitterStrategy::Equal => {
            let half = delay / 2;
            if half == 0 {
                delay
            } else {
                half + rand::thread_rng().gen_range(0..=half)
            }
        }
    };

    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.base_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 8000);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Exponential);
        assert_eq!(config.jitter_strategy, JitterStrategy::None);
    }

    #[test]
    fn test_immediate_policy_never_sleeps() {
        let config = RetryConfig::immediate(6).with_jitter(JitterStrategy::Equal);

        assert_eq!(config.max_attempts, 6);
        assert!((0..5).all(|retry| calculate_delay(retry, &config).is_zero()));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts":2,"backoff_strategy":"linear"}"#).unwrap();

        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Linear);
        assert_eq!(config.max_delay_ms, 8000);
    }

    #[test]
    fn test_default_schedule_doubles_then_caps() {
        let config = RetryConfig::default();
        let delays: Vec<u128> = (0..6)
            .map(|retry| calculate_delay(retry, &config).as_millis())
            .collect();

        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000, 8000]);
    }

    #[test]
    fn test_linear_and_constant() {
        let linear = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Linear);
        assert_eq!(calculate_delay(2, &linear), Duration::from_millis(300));

        let constant = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Constant);
        assert_eq!(calculate_delay(5, &constant), Duration::from_millis(100));
    }

    #[test]
    fn test_full_jitter_stays_below_delay() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Constant)
            .with_jitter(JitterStrategy::Full);

        for _ in 0..20 {
            assert!(calculate_delay(0, &config) <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_retry_state_ceiling() {
        let config = RetryConfig::new().with_max_attempts(3);
        let mut state = RetryState::new();

        // First call failed; two retries remain.
        assert!(state.can_retry(&config));
        let _ = state.next_delay(&config);
        assert!(state.can_retry(&config));
        let _ = state.next_delay(&config);
        assert!(!state.can_retry(&config));
        assert_eq!(state.retries, 2);
    }

    #[test]
    fn test_zero_attempts_still_allows_first_call_only() {
        let config = RetryConfig::new().with_max_attempts(0);
        let state = RetryState::new();
        assert!(!state.can_retry(&config));
    }
}
