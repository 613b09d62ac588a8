use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-batch knobs supplied by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Upper bound on files scanned at the same time. Zero is treated as one.
    pub max_concurrency: usize,
    pub fcx_mode: bool,
    /// Skip batch progress snapshots entirely.
    pub disable_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get().clamp(1, 8),
            fcx_mode: false,
            disable_progress: false,
        }
    }
}

impl ScanOptions {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

/// Retry/backoff policy for analyzer invocations.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Percentage-based jitter to spread out retries.
    pub jitter_ratio: f32,
    /// Minimum jitter in milliseconds so tiny delays still randomise a bit.
    pub jitter_min_ms: u64,
}

impl RetryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 100,
            backoff_max_ms: 2_000,
            jitter_ratio: 0.25,
            jitter_min_ms: 10,
        }
    }
}

/// Sizing for the in-memory analysis cache.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Entries older than this are reclaimed; `0` keeps them until evicted
    /// for space.
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_024,
            ttl_secs: 30 * 60,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Per-invocation analyzer timeout; `0` disables it.
    pub analyzer_timeout_ms: u64,
}

impl ExecutorConfig {
    pub fn analyzer_timeout(&self) -> Option<Duration> {
        (self.analyzer_timeout_ms > 0)
            .then(|| Duration::from_millis(self.analyzer_timeout_ms))
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            analyzer_timeout_ms: 30_000,
        }
    }
}
