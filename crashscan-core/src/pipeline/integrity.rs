use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_stream::stream;
use async_trait::async_trait;
use crashscan_model::{
    AnalysisOutcome, IntegrityOutcome, IntegrityStatus, ScanResult, ScanStatus,
};
use futures::future::{BoxFuture, Shared};
use futures::{FutureExt, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ScanPipeline, ScanResultStream};
use crate::config::ScanOptions;
use crate::error::{Result, ScanError};
use crate::ports::{IntegrityChecker, MessageSink, ProgressSink};

/// Analyzer name under which the integrity outcome is merged into results.
pub const INTEGRITY_ANALYZER_NAME: &str = "FCX Integrity Check";

/// Log path of the synthetic result emitted for critical integrity problems.
pub const INTEGRITY_SENTINEL_PATH: &str = "FCX_CHECK";

#[derive(Clone, Debug)]
enum CheckOutcome {
    Checked(IntegrityOutcome),
    Errored(String),
    Cancelled,
}

type SharedCheck = Shared<BoxFuture<'static, CheckOutcome>>;

/// Runs a game integrity check once per batch and merges its outcome into
/// every result of that batch.
///
/// Concurrent callers join the check already in flight instead of starting
/// another. A critical finding also yields one sentinel result carrying
/// only the integrity outcome, ahead of the file results.
pub struct IntegrityCheckPipeline {
    inner: Arc<dyn ScanPipeline>,
    checker: Arc<dyn IntegrityChecker>,
    game_path: Option<PathBuf>,
    messages: Arc<dyn MessageSink>,
    in_flight: Mutex<Option<SharedCheck>>,
    checks_started: AtomicU64,
}

impl fmt::Debug for IntegrityCheckPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrityCheckPipeline")
            .field("inner", &self.inner)
            .field("checker", &self.checker)
            .field("game_path", &self.game_path)
            .field(
                "checks_started",
                &self.checks_started.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl IntegrityCheckPipeline {
    pub fn new(
        inner: Arc<dyn ScanPipeline>,
        checker: Arc<dyn IntegrityChecker>,
        game_path: Option<PathBuf>,
        messages: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            inner,
            checker,
            game_path,
            messages,
            in_flight: Mutex::new(None),
            checks_started: AtomicU64::new(0),
        }
    }

    /// Number of integrity checks actually executed so far.
    pub fn checks_started(&self) -> u64 {
        self.checks_started.load(Ordering::Relaxed)
    }

    fn start_check(&self, cancel: &CancellationToken) -> SharedCheck {
        self.checks_started.fetch_add(1, Ordering::Relaxed);
        let checker = Arc::clone(&self.checker);
        let game_path = self.game_path.clone();
        let cancel = cancel.clone();

        async move {
            debug!(
                target: "scan::integrity",
                game_path = ?game_path,
                "game integrity check started"
            );
            match checker
                .check_game_integrity(game_path.as_deref(), &cancel)
                .await
            {
                Ok(report) => CheckOutcome::Checked(report),
                Err(error) if error.is_cancelled() => CheckOutcome::Cancelled,
                Err(error) => CheckOutcome::Errored(error.to_string()),
            }
        }
        .boxed()
        .shared()
    }

    async fn run_check(&self, cancel: &CancellationToken) -> CheckOutcome {
        loop {
            let check = {
                let mut gate = self.in_flight.lock().await;
                match gate.as_ref() {
                    Some(check) if check.peek().is_none() => check.clone(),
                    _ => {
                        let check = self.start_check(cancel);
                        *gate = Some(check.clone());
                        check
                    }
                }
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => CheckOutcome::Cancelled,
                outcome = check => outcome,
            };

            // A joined check may have been cancelled by the caller that
            // started it; run our own unless we were cancelled as well.
            if matches!(outcome, CheckOutcome::Cancelled)
                && !cancel.is_cancelled()
            {
                continue;
            }
            return outcome;
        }
    }

    fn announce(&self, check: &CheckOutcome) {
        match check {
            CheckOutcome::Checked(report) => {
                let summary = report.messages.join("; ");
                match report.status {
                    IntegrityStatus::Good => {
                        self.messages.success("Game integrity check passed")
                    }
                    IntegrityStatus::Critical => self.messages.critical(
                        &format!("Critical game integrity problem: {summary}"),
                    ),
                    status => self.messages.warning(&format!(
                        "Game integrity {status:?}: {summary}"
                    )),
                }
                info!(
                    target: "scan::integrity",
                    status = ?report.status,
                    "game integrity check finished"
                );
            }
            CheckOutcome::Errored(error) => {
                warn!(
                    target: "scan::integrity",
                    error = %error,
                    "game integrity check failed"
                );
                self.messages
                    .error(&format!("Game integrity check failed: {error}"));
            }
            CheckOutcome::Cancelled => {}
        }
    }
}

fn to_analysis_outcome(check: &CheckOutcome) -> AnalysisOutcome {
    match check {
        CheckOutcome::Checked(report) => {
            let mut outcome = AnalysisOutcome::success(INTEGRITY_ANALYZER_NAME)
                .with_data("status", format!("{:?}", report.status));
            if let Some(path) = &report.game_path {
                outcome =
                    outcome.with_data("game_path", path.display().to_string());
            }
            if let Some(digest) = &report.executable_digest {
                outcome = outcome.with_data("executable_digest", digest);
            }
            if !report.status.is_good() {
                outcome = if report.messages.is_empty() {
                    outcome.with_report_line(format!(
                        "Game integrity status: {:?}",
                        report.status
                    ))
                } else {
                    outcome.with_report_lines(report.messages.iter().cloned())
                };
            }
            outcome
        }
        CheckOutcome::Errored(error) => {
            AnalysisOutcome::failure(INTEGRITY_ANALYZER_NAME, error)
        }
        CheckOutcome::Cancelled => AnalysisOutcome::failure(
            INTEGRITY_ANALYZER_NAME,
            "integrity check cancelled",
        ),
    }
}

fn sentinel_result(outcome: AnalysisOutcome) -> ScanResult {
    ScanResult {
        status: ScanStatus::CompletedWithErrors,
        analysis_outcomes: vec![outcome],
        ..ScanResult::pending(INTEGRITY_SENTINEL_PATH)
    }
}

#[async_trait]
impl ScanPipeline for IntegrityCheckPipeline {
    async fn process_single(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        let check = self.run_check(cancel).await;
        if matches!(check, CheckOutcome::Cancelled) {
            return Err(ScanError::Cancelled);
        }

        let mut result = self.inner.process_single(path, cancel).await?;
        result.merge_outcome(to_analysis_outcome(&check));
        Ok(result)
    }

    fn process_batch<'a>(
        &'a self,
        paths: Vec<PathBuf>,
        options: ScanOptions,
        progress: Option<Arc<dyn ProgressSink>>,
        cancel: CancellationToken,
    ) -> ScanResultStream<'a> {
        if !options.fcx_mode {
            return self.inner.process_batch(paths, options, progress, cancel);
        }

        Box::pin(stream! {
            let check = self.run_check(&cancel).await;
            if matches!(check, CheckOutcome::Cancelled) {
                yield Err(ScanError::Cancelled);
                return;
            }
            self.announce(&check);

            let outcome = to_analysis_outcome(&check);
            if let CheckOutcome::Checked(report) = &check
                && report.status.is_critical()
            {
                yield Ok(sentinel_result(outcome.clone()));
            }

            // Non-cancellation failures arrive here already converted into
            // `Failed` results, so every file still gets the outcome.
            let mut results =
                self.inner.process_batch(paths, options, progress, cancel);
            while let Some(item) = results.next().await {
                yield item.map(|mut result| {
                    result.merge_outcome(outcome.clone());
                    result
                });
            }
        })
    }
}
