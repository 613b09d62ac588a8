use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::AnalyzerError;

/// Decides whether a failed analyzer attempt is tried again, and after how
/// long. Attempts are numbered from 1.
pub trait ErrorPolicy: Send + Sync + fmt::Debug {
    fn max_attempts(&self) -> u32;

    fn should_retry(&self, error: &AnalyzerError, attempt: u32) -> bool;

    /// Delay before the attempt following `attempt`. `key` identifies the
    /// work being retried so that concurrent retries spread out.
    fn backoff_delay(&self, attempt: u32, key: &str) -> Duration;
}

/// Bounded exponential backoff with deterministic jitter. Retries transient
/// failures and timeouts; fatal errors and cancellation are final.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultErrorPolicy {
    config: RetryConfig,
}

impl DefaultErrorPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn base_delay_ms(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return 0;
        }

        let exp = attempt.saturating_sub(1).min(32) as i32;
        let scaled = (self.config.backoff_base_ms as f64) * 2f64.powi(exp);
        let capped = scaled.min(self.config.backoff_max_ms as f64);
        capped.max(0.0) as u64
    }

    fn jittered_delay_for_anchor(
        &self,
        anchor_ms: u64,
        key: &str,
        attempt: u32,
    ) -> u64 {
        if anchor_ms == 0 {
            return 0;
        }

        let max_ms = self.config.backoff_max_ms as f64;
        let jitter_ratio = f64::from(self.config.jitter_ratio.max(0.0));
        let jitter_span = ((anchor_ms as f64) * jitter_ratio)
            .max(self.config.jitter_min_ms as f64)
            .min(max_ms);

        let lower = 0f64.max(anchor_ms as f64 - jitter_span);
        let upper = (anchor_ms as f64 + jitter_span).min(max_ms);
        if upper <= lower {
            return lower.round() as u64;
        }

        let unit = deterministic_unit(key, attempt);
        (lower + (upper - lower) * unit).round() as u64
    }
}

fn deterministic_unit(key: &str, attempt: u32) -> f64 {
    let mut hasher = DefaultHasher::default();
    key.hash(&mut hasher);
    attempt.hash(&mut hasher);
    (hasher.finish() as f64) / (u64::MAX as f64)
}

impl ErrorPolicy for DefaultErrorPolicy {
    fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    fn should_retry(&self, error: &AnalyzerError, attempt: u32) -> bool {
        attempt < self.max_attempts()
            && matches!(
                error,
                AnalyzerError::Transient(_) | AnalyzerError::Timeout(_)
            )
    }

    fn backoff_delay(&self, attempt: u32, key: &str) -> Duration {
        let anchor = self.base_delay_ms(attempt);
        Duration::from_millis(self.jittered_delay_for_anchor(
            anchor, key, attempt,
        ))
    }
}

/// Single attempt, no backoff. Keeps runs reproducible.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetryPolicy;

impl ErrorPolicy for NoRetryPolicy {
    fn max_attempts(&self) -> u32 {
        1
    }

    fn should_retry(&self, _error: &AnalyzerError, _attempt: u32) -> bool {
        false
    }

    fn backoff_delay(&self, _attempt: u32, _key: &str) -> Duration {
        Duration::ZERO
    }
}
