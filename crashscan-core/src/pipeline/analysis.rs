use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use crashscan_model::{AnalysisOutcome, ParsedLog, ScanResult, ScanStatus};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ScanPipeline, ScanResultStream, batch};
use crate::config::ScanOptions;
use crate::error::{ParseError, Result, ScanError};
use crate::ports::{
    LogParser, NoopObserver, ProgressSink, ScanObserver, SharedAnalyzer,
};
use crate::resilience::ResilientExecutor;

/// Base pipeline: parses a log and schedules its analyzers.
///
/// Non-parallelizable analyzers run first, one at a time in ascending
/// priority. The parallelizable group then runs concurrently. Outcomes are
/// recorded in that order: sequential ones by priority, parallel ones by
/// completion.
///
/// Cloning is cheap: parser, analyzers and observer are shared handles.
#[derive(Clone)]
pub struct AnalysisPipeline {
    parser: Arc<dyn LogParser>,
    sequential: Vec<SharedAnalyzer>,
    parallel: Vec<SharedAnalyzer>,
    executor: ResilientExecutor,
    observer: Arc<dyn ScanObserver>,
}

impl fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |group: &[SharedAnalyzer]| {
            group
                .iter()
                .map(|analyzer| analyzer.name().to_owned())
                .collect::<Vec<_>>()
        };
        f.debug_struct("AnalysisPipeline")
            .field("parser", &self.parser)
            .field("sequential", &names(&self.sequential))
            .field("parallel", &names(&self.parallel))
            .field("executor", &self.executor)
            .finish()
    }
}

/// Marker for a phase interrupted by cancellation.
struct Interrupted;

impl AnalysisPipeline {
    pub fn new(
        parser: Arc<dyn LogParser>,
        analyzers: Vec<SharedAnalyzer>,
        executor: ResilientExecutor,
    ) -> Self {
        let (mut parallel, mut sequential): (Vec<_>, Vec<_>) = analyzers
            .into_iter()
            .partition(|analyzer| analyzer.parallelizable());
        // Stable sort keeps registration order among equal priorities.
        sequential.sort_by_key(|analyzer| analyzer.priority());
        parallel.sort_by_key(|analyzer| analyzer.priority());

        Self {
            parser,
            sequential,
            parallel,
            executor,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    pub fn analyzer_count(&self) -> usize {
        self.sequential.len() + self.parallel.len()
    }

    async fn run_sequential(
        &self,
        log: &ParsedLog,
        path: &Path,
        cancel: &CancellationToken,
        outcomes: &mut Vec<AnalysisOutcome>,
    ) -> std::result::Result<(), Interrupted> {
        for analyzer in &self.sequential {
            if cancel.is_cancelled() {
                return Err(Interrupted);
            }

            self.observer.analyzer_started(analyzer.name(), path);
            let outcome =
                self.executor.execute(analyzer.as_ref(), log, cancel).await;
            match outcome {
                Ok(outcome) => {
                    self.observer.analyzer_completed(
                        analyzer.name(),
                        path,
                        outcome.succeeded,
                    );
                    outcomes.push(outcome);
                }
                Err(_) => {
                    self.observer
                        .analyzer_completed(analyzer.name(), path, false);
                    return Err(Interrupted);
                }
            }
        }
        Ok(())
    }

    async fn run_parallel(
        &self,
        log: &Arc<ParsedLog>,
        path: &Path,
        cancel: &CancellationToken,
        outcomes: &mut Vec<AnalysisOutcome>,
    ) -> std::result::Result<(), Interrupted> {
        if self.parallel.is_empty() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(Interrupted);
        }

        let mut tasks = JoinSet::new();
        for (slot, analyzer) in self.parallel.iter().enumerate() {
            let analyzer = Arc::clone(analyzer);
            let log = Arc::clone(log);
            let executor = self.executor.clone();
            let observer = Arc::clone(&self.observer);
            let path = path.to_path_buf();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                observer.analyzer_started(analyzer.name(), &path);
                let outcome =
                    executor.execute(analyzer.as_ref(), &log, &cancel).await;
                let succeeded =
                    outcome.as_ref().is_ok_and(|outcome| outcome.succeeded);
                observer.analyzer_completed(analyzer.name(), &path, succeeded);
                (slot, outcome)
            });
        }

        let mut reported = vec![false; self.parallel.len()];
        let mut interrupted = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => {
                    reported[slot] = true;
                    match outcome {
                        Ok(outcome) => outcomes.push(outcome),
                        Err(_) => interrupted = true,
                    }
                }
                Err(join_error) => {
                    warn!(
                        target: "scan::pipeline",
                        path = %path.display(),
                        error = %join_error,
                        "analyzer task did not complete"
                    );
                }
            }
        }

        // Tasks that died without reporting still owe the file an outcome.
        for (analyzer, _) in self
            .parallel
            .iter()
            .zip(&reported)
            .filter(|(_, reported)| !**reported)
        {
            outcomes.push(AnalysisOutcome::failure(
                analyzer.name(),
                "analyzer task aborted",
            ));
        }

        if interrupted { Err(Interrupted) } else { Ok(()) }
    }
}

#[async_trait]
impl ScanPipeline for AnalysisPipeline {
    async fn process_single(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let started = Instant::now();
        self.observer.file_started(path);

        let log = match self.parser.parse(path, cancel).await {
            Ok(log) => Arc::new(log),
            Err(error)
                if matches!(error, ParseError::Cancelled)
                    || cancel.is_cancelled() =>
            {
                self.observer.file_completed(path, ScanStatus::Cancelled);
                return Err(ScanError::Cancelled);
            }
            Err(error) => {
                debug!(
                    target: "scan::pipeline",
                    path = %path.display(),
                    error = %error,
                    "crash log could not be parsed"
                );
                let mut result = ScanResult::failed(
                    path,
                    format!("Failed to parse crash log: {error}"),
                );
                result.processing_time = started.elapsed();
                self.observer.file_completed(path, result.status);
                return Ok(result);
            }
        };

        let mut result = ScanResult {
            status: ScanStatus::InProgress,
            parsed_log: Some(Arc::clone(&log)),
            ..ScanResult::pending(PathBuf::from(path))
        };

        let mut outcomes =
            Vec::with_capacity(self.sequential.len() + self.parallel.len());
        let phases = match self
            .run_sequential(&log, path, cancel, &mut outcomes)
            .await
        {
            Ok(()) => self.run_parallel(&log, path, cancel, &mut outcomes).await,
            Err(interrupted) => Err(interrupted),
        };

        result.status = match phases {
            Ok(()) => ScanStatus::from_outcomes(&outcomes),
            Err(Interrupted) => ScanStatus::Cancelled,
        };
        result.analysis_outcomes = outcomes;
        result.processing_time = started.elapsed();

        debug!(
            target: "scan::pipeline",
            path = %path.display(),
            status = ?result.status,
            outcomes = result.analysis_outcomes.len(),
            elapsed_ms = result.processing_time.as_millis() as u64,
            "file scanned"
        );
        self.observer.file_completed(path, result.status);
        Ok(result)
    }

    fn process_batch<'a>(
        &'a self,
        paths: Vec<PathBuf>,
        options: ScanOptions,
        progress: Option<Arc<dyn ProgressSink>>,
        cancel: CancellationToken,
    ) -> ScanResultStream<'a> {
        batch::stream_batch(
            paths,
            options,
            progress,
            Arc::clone(&self.observer),
            cancel,
            move |path, cancel| {
                let pipeline = self.clone();
                async move { pipeline.process_single(&path, &cancel).await }
            },
        )
    }
}
