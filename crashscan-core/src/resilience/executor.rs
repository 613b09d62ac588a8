use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crashscan_model::{AnalysisOutcome, ParsedLog};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ErrorPolicy, NoRetryPolicy};
use crate::cache::{CacheStats, CacheStore, Fingerprint, NoopCacheStore};
use crate::error::AnalyzerError;
use crate::ports::Analyzer;

/// Cache store specialised for analyzer outcomes.
pub type OutcomeCache = dyn CacheStore<AnalysisOutcome, AnalyzerError>;

/// Runs analyzers through a cache and an error policy.
///
/// Ordinary failures never escape `execute`: once the policy gives up, the
/// error becomes a failed [`AnalysisOutcome`]. Only cancellation is returned
/// as an error.
#[derive(Clone)]
pub struct ResilientExecutor {
    policy: Arc<dyn ErrorPolicy>,
    cache: Arc<OutcomeCache>,
    timeout: Option<Duration>,
}

impl fmt::Debug for ResilientExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("policy", &self.policy)
            .field("cache", &self.cache)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self::basic()
    }
}

impl ResilientExecutor {
    pub fn new(policy: Arc<dyn ErrorPolicy>, cache: Arc<OutcomeCache>) -> Self {
        Self {
            policy,
            cache,
            timeout: None,
        }
    }

    /// Single attempt, nothing memoized.
    pub fn basic() -> Self {
        Self::new(Arc::new(NoRetryPolicy), Arc::new(NoopCacheStore))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> &Arc<dyn ErrorPolicy> {
        &self.policy
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn execute(
        &self,
        analyzer: &dyn Analyzer,
        log: &ParsedLog,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let key = Fingerprint::for_analyzer(log, analyzer);
        let compute = self.run_with_retries(analyzer, log, cancel).boxed();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AnalyzerError::Cancelled),
            outcome = self.cache.get_or_compute(&key, compute) => outcome,
        }?;

        if !outcome.succeeded {
            self.cache.invalidate(&key);
        }
        Ok(outcome)
    }

    async fn run_with_retries(
        &self,
        analyzer: &dyn Analyzer,
        log: &ParsedLog,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        let name = analyzer.name();
        let max_attempts = self.policy.max_attempts().max(1);
        let mut attempt = 1;

        loop {
            let error = match self.invoke(analyzer, log, cancel).await {
                Ok(outcome) => return Ok(outcome),
                Err(AnalyzerError::Cancelled) => {
                    return Err(AnalyzerError::Cancelled);
                }
                Err(_) if cancel.is_cancelled() => {
                    return Err(AnalyzerError::Cancelled);
                }
                Err(error) => error,
            };

            if attempt >= max_attempts
                || !self.policy.should_retry(&error, attempt)
            {
                warn!(
                    target: "scan::executor",
                    analyzer = name,
                    attempt,
                    error = %error,
                    "analyzer failed"
                );
                return Ok(AnalysisOutcome::failure(name, error.to_string()));
            }

            let delay = self.policy.backoff_delay(attempt, name);
            debug!(
                target: "scan::executor",
                analyzer = name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying analyzer"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AnalyzerError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn invoke(
        &self,
        analyzer: &dyn Analyzer,
        log: &ParsedLog,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        let guarded = AssertUnwindSafe(analyzer.analyze(log, cancel))
            .catch_unwind()
            .map(|result| {
                result.unwrap_or_else(|panic| {
                    Err(AnalyzerError::Fatal(format!(
                        "analyzer panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                })
            });

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .unwrap_or(Err(AnalyzerError::Timeout(limit))),
            None => guarded.await,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
