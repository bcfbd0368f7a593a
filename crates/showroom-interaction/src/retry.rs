//! Retry policy and the attempt state machine.

use crate::error::BackendError;
use rand::Rng;
use showroom_core::config::RetryConfig;
use std::time::Duration;

/// Bounded exponential backoff with symmetric random jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts on the primary backend, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Jitter as a fraction of the delay (0.25 = ±25 %).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Delay before the next attempt after `failed_attempts` failures.
    ///
    /// `jitter_sample` is in `[0, 1)`; 0.5 yields the un-jittered delay.
    pub fn delay_for(&self, failed_attempts: u32, jitter_sample: f64) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        let base = self.base_delay.as_secs_f64() * f64::from(1u32 << exponent);
        let factor = 1.0 + self.jitter * (2.0 * jitter_sample.clamp(0.0, 1.0) - 1.0);
        Duration::try_from_secs_f64((base * factor).max(0.0))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn sample_delay(&self, failed_attempts: u32) -> Duration {
        let sample: f64 = rand::thread_rng().r#gen();
        self.delay_for(failed_attempts, sample)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Retry { delay: Duration },
    SwitchToFallback,
    GiveUp,
}

/// Tracks attempts of one logical call: primary attempts first, then at most
/// one attempt on the fallback backend.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    policy: RetryPolicy,
    fallback_available: bool,
    failures: u32,
    on_fallback: bool,
}

impl AttemptTracker {
    pub fn new(policy: RetryPolicy, fallback_available: bool) -> Self {
        Self {
            policy,
            fallback_available,
            failures: 0,
            on_fallback: false,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn is_on_fallback(&self) -> bool {
        self.on_fallback
    }

    /// Classifies a failure and decides the next step.
    ///
    /// Retryable failures are retried on the primary until `max_attempts`;
    /// a server-supplied `Retry-After` raises the delay, which never exceeds
    /// `max_delay`. Any other outcome moves to the fallback once, if there is
    /// one. A failure on the fallback is final.
    pub fn record_failure(&mut self, error: &BackendError) -> Decision {
        self.failures += 1;

        if self.on_fallback {
            return Decision::GiveUp;
        }

        if error.is_retryable() && self.failures < self.policy.max_attempts {
            let mut delay = self.policy.sample_delay(self.failures);
            if let Some(retry_after) = error.retry_after() {
                delay = delay.max(retry_after).min(self.policy.max_delay);
            }
            return Decision::Retry { delay };
        }

        if self.fallback_available {
            self.on_fallback = true;
            return Decision::SwitchToFallback;
        }

        Decision::GiveUp
    }
}
