//! Bounded-concurrency streaming over many files.

use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use crashscan_model::{BatchProgressSnapshot, ScanResult, ScanStatus};
use futures::FutureExt;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ScanResultStream;
use crate::config::ScanOptions;
use crate::error::{Result, ScanError};
use crate::ports::{ProgressSink, ScanObserver};

/// Drops repeated paths, keeping the first occurrence of each.
pub fn dedup_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::with_capacity(paths.len());
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

#[derive(Debug)]
struct Tally {
    total_files: usize,
    processed_files: usize,
    successful_scans: usize,
    failed_scans: usize,
    started: Instant,
}

impl Tally {
    fn new(total_files: usize) -> Self {
        Self {
            total_files,
            processed_files: 0,
            successful_scans: 0,
            failed_scans: 0,
            started: Instant::now(),
        }
    }

    fn record(&mut self, status: ScanStatus) {
        self.processed_files += 1;
        if status.is_success() {
            self.successful_scans += 1;
        } else {
            self.failed_scans += 1;
        }
    }

    fn snapshot(&self) -> BatchProgressSnapshot {
        BatchProgressSnapshot {
            total_files: self.total_files,
            processed_files: self.processed_files,
            successful_scans: self.successful_scans,
            failed_scans: self.failed_scans,
            elapsed: self.started.elapsed(),
        }
    }
}

type FileScan = (PathBuf, Result<ScanResult>);

enum Step {
    Cancelled,
    Finished(std::result::Result<FileScan, JoinError>),
    Admit(std::result::Result<OwnedSemaphorePermit, AcquireError>),
    Drained,
}

/// Runs `scan` over the deduplicated `paths`, at most
/// `options.max_concurrency` at a time.
///
/// Each admitted file runs as its own runtime task, so parsing, hashing and
/// sequential analyzers of different files proceed in parallel. The stream
/// ends once every admitted file has been yielded.
///
/// Cancellation is checked before each admission and handed to every scan.
/// Once observed, nothing new is dispatched; in-flight scans are drained,
/// cancelled ones are dropped, and the stream ends with `Err(Cancelled)`.
/// Non-cancellation errors from `scan` become `Failed` results so that every
/// admitted file yields exactly one result. Dropping the stream aborts the
/// in-flight tasks.
pub fn stream_batch<'a, F, Fut>(
    paths: Vec<PathBuf>,
    options: ScanOptions,
    progress: Option<Arc<dyn ProgressSink>>,
    observer: Arc<dyn ScanObserver>,
    cancel: CancellationToken,
    scan: F,
) -> ScanResultStream<'a>
where
    F: Fn(PathBuf, CancellationToken) -> Fut + Send + Sync + 'a,
    Fut: Future<Output = Result<ScanResult>> + Send + 'static,
{
    let progress = progress.filter(|_| !options.disable_progress);

    Box::pin(stream! {
        let paths = dedup_paths(paths);
        let limit = options.effective_concurrency();
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tally = Tally::new(paths.len());
        let mut pending = paths.into_iter().peekable();
        let mut in_flight: JoinSet<FileScan> = JoinSet::new();
        let mut cancelled = false;

        observer.batch_started(tally.total_files);
        info!(
            target: "scan::batch",
            total_files = tally.total_files,
            max_concurrency = limit,
            "batch started"
        );

        loop {
            let admit = !cancelled && pending.peek().is_some();
            if !admit && in_flight.is_empty() {
                break;
            }

            let step = tokio::select! {
                biased;
                _ = cancel.cancelled(), if !cancelled => Step::Cancelled,
                Some(joined) = in_flight.join_next(),
                    if !in_flight.is_empty() => Step::Finished(joined),
                permit = Arc::clone(&semaphore).acquire_owned(), if admit => {
                    Step::Admit(permit)
                }
                else => Step::Drained,
            };

            match step {
                Step::Cancelled => {
                    cancelled = true;
                    info!(
                        target: "scan::batch",
                        in_flight = in_flight.len(),
                        remaining = pending.len(),
                        "batch cancellation requested"
                    );
                }
                Step::Admit(Err(err)) => {
                    yield Err(ScanError::Internal(format!(
                        "batch admission failed: {err}"
                    )));
                    return;
                }
                Step::Admit(Ok(permit)) => {
                    if cancel.is_cancelled() {
                        cancelled = true;
                        continue;
                    }
                    let Some(path) = pending.next() else {
                        continue;
                    };
                    debug!(
                        target: "scan::batch",
                        path = %path.display(),
                        "file admitted"
                    );
                    let file_scan = scan(path.clone(), cancel.clone());
                    in_flight.spawn(async move {
                        let _permit = permit;
                        let result = AssertUnwindSafe(file_scan)
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|_| {
                                Err(ScanError::Internal(
                                    "file scan panicked".to_owned(),
                                ))
                            });
                        (path, result)
                    });
                }
                Step::Finished(Err(join_error)) => {
                    warn!(
                        target: "scan::batch",
                        error = %join_error,
                        "file scan task did not complete"
                    );
                    tally.record(ScanStatus::Failed);
                }
                Step::Finished(Ok((path, result))) => {
                    let result = match result {
                        Ok(result) if result.status == ScanStatus::Cancelled => {
                            tally.record(result.status);
                            continue;
                        }
                        Ok(result) => result,
                        Err(err) if err.is_cancelled() => {
                            tally.record(ScanStatus::Cancelled);
                            continue;
                        }
                        Err(err) => {
                            warn!(
                                target: "scan::batch",
                                path = %path.display(),
                                error = %err,
                                "file scan failed outside the pipeline"
                            );
                            ScanResult::failed(path, err.to_string())
                        }
                    };

                    tally.record(result.status);
                    if let Some(sink) = progress.as_deref() {
                        sink.report(tally.snapshot());
                    }
                    yield Ok(result);
                }
                Step::Drained => break,
            }
        }

        let summary = tally.snapshot();
        if cancelled {
            info!(
                target: "scan::batch",
                processed = summary.processed_files,
                total = summary.total_files,
                "batch cancelled"
            );
            yield Err(ScanError::Cancelled);
        } else {
            info!(
                target: "scan::batch",
                processed = summary.processed_files,
                successful = summary.successful_scans,
                failed = summary.failed_scans,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "batch completed"
            );
        }
    })
}
