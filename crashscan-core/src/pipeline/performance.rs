use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_stream::stream;
use async_trait::async_trait;
use crashscan_model::ScanResult;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{ScanPipeline, ScanResultStream};
use crate::config::ScanOptions;
use crate::error::Result;
use crate::ports::ProgressSink;

/// Aggregate timings gathered by [`PerformanceMonitoringPipeline`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerformanceSnapshot {
    pub single_calls: u64,
    pub batch_calls: u64,
    /// Per-file timings recorded, from single calls and batch results.
    pub files_observed: u64,
    pub total_file_time: Duration,
    pub min_file_time: Option<Duration>,
    pub max_file_time: Option<Duration>,
    pub last_batch_elapsed: Option<Duration>,
}

impl PerformanceSnapshot {
    pub fn mean_file_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.files_observed).ok()?;
        (count > 0).then(|| self.total_file_time / count)
    }
}

/// Thread-safe accumulator behind a [`PerformanceSnapshot`].
#[derive(Debug, Default)]
pub struct PerformanceRecorder {
    state: Mutex<PerformanceSnapshot>,
}

impl PerformanceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PerformanceSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_single(&self, elapsed: Duration) {
        let mut state = self.lock();
        state.single_calls += 1;
        observe_file(&mut state, elapsed);
    }

    fn record_batch_started(&self) {
        self.lock().batch_calls += 1;
    }

    fn record_batch_file(&self, elapsed: Duration) {
        observe_file(&mut self.lock(), elapsed);
    }

    fn record_batch_finished(&self, elapsed: Duration) {
        self.lock().last_batch_elapsed = Some(elapsed);
    }
}

fn observe_file(state: &mut PerformanceSnapshot, elapsed: Duration) {
    state.files_observed += 1;
    state.total_file_time += elapsed;
    state.min_file_time =
        Some(state.min_file_time.map_or(elapsed, |min| min.min(elapsed)));
    state.max_file_time =
        Some(state.max_file_time.map_or(elapsed, |max| max.max(elapsed)));
}

/// Outermost decorator: times every delegated call and leaves results
/// untouched.
pub struct PerformanceMonitoringPipeline {
    inner: Arc<dyn ScanPipeline>,
    recorder: Arc<PerformanceRecorder>,
}

impl fmt::Debug for PerformanceMonitoringPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitoringPipeline")
            .field("inner", &self.inner)
            .field("recorder", &self.recorder.snapshot())
            .finish()
    }
}

impl PerformanceMonitoringPipeline {
    pub fn new(
        inner: Arc<dyn ScanPipeline>,
        recorder: Arc<PerformanceRecorder>,
    ) -> Self {
        Self { inner, recorder }
    }

    pub fn recorder(&self) -> &Arc<PerformanceRecorder> {
        &self.recorder
    }
}

#[async_trait]
impl ScanPipeline for PerformanceMonitoringPipeline {
    async fn process_single(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        let started = Instant::now();
        let result = self.inner.process_single(path, cancel).await;
        self.recorder.record_single(started.elapsed());
        result
    }

    fn process_batch<'a>(
        &'a self,
        paths: Vec<PathBuf>,
        options: ScanOptions,
        progress: Option<Arc<dyn ProgressSink>>,
        cancel: CancellationToken,
    ) -> ScanResultStream<'a> {
        let mut results =
            self.inner.process_batch(paths, options, progress, cancel);

        Box::pin(stream! {
            let started = Instant::now();
            self.recorder.record_batch_started();

            while let Some(item) = results.next().await {
                if let Ok(result) = &item {
                    self.recorder.record_batch_file(result.processing_time);
                }
                yield item;
            }

            let elapsed = started.elapsed();
            self.recorder.record_batch_finished(elapsed);
            let snapshot = self.recorder.snapshot();
            info!(
                target: "scan::perf",
                batch_ms = elapsed.as_millis() as u64,
                files_observed = snapshot.files_observed,
                mean_file_ms = snapshot
                    .mean_file_time()
                    .map_or(0, |mean| mean.as_millis() as u64),
                max_file_ms = snapshot
                    .max_file_time
                    .map_or(0, |max| max.as_millis() as u64),
                "batch timing"
            );
        })
    }
}
