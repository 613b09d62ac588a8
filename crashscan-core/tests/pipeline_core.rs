mod support;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use crashscan_core::error::ParseError;
use crashscan_core::ports::{LogParser, SharedAnalyzer};
use crashscan_core::{PipelineBuilder, ProgressReporter, ScanError};
use crashscan_model::{ParsedLog, ScanStatus};
use support::{ConcurrencyGauge, RecordingAnalyzer, crash_log, write_log};
use tokio_util::sync::CancellationToken;

fn builder() -> PipelineBuilder {
    PipelineBuilder::new()
        .caching(false)
        .enhanced_error_handling(false)
}

#[tokio::test]
async fn result_path_matches_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_log(dir.path(), "crash-a.log", &crash_log(1));
    let built = builder()
        .with_default_analyzers()
        .build()
        .expect("build");

    let result = built
        .pipeline
        .process_single(&path, &CancellationToken::new())
        .await
        .expect("scan");

    assert_eq!(result.log_path, path);
    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.analysis_outcomes.len(), 3);
    assert!(result.parsed_log.is_some());
}

#[tokio::test]
async fn missing_file_fails_without_running_analyzers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let analyzer = Arc::new(RecordingAnalyzer::new("marker", 1, true));
    let built = builder()
        .analyzer(analyzer.clone())
        .build()
        .expect("build");

    let missing = dir.path().join("nope.log");
    let result = built
        .pipeline
        .process_single(&missing, &CancellationToken::new())
        .await
        .expect("scan");

    assert_eq!(result.log_path, missing);
    assert_eq!(result.status, ScanStatus::Failed);
    assert!(result.parsed_log.is_none());
    assert!(result.analysis_outcomes.is_empty());
    assert!(result.error_messages[0].starts_with("Failed to parse crash log:"));
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequential_analyzers_follow_priority_every_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_log(dir.path(), "crash.log", &crash_log(7));
    let journal = Arc::new(Mutex::new(Vec::new()));
    let gauge = Arc::new(ConcurrencyGauge::default());

    // Registered out of order on purpose.
    let analyzers: Vec<SharedAnalyzer> = [("p15", 15), ("p5", 5), ("p10", 10)]
        .into_iter()
        .map(|(name, priority)| {
            Arc::new(
                RecordingAnalyzer::new(name, priority, false)
                    .delay(Duration::from_millis(2))
                    .journal(Arc::clone(&journal))
                    .gauge(Arc::clone(&gauge)),
            ) as SharedAnalyzer
        })
        .collect();
    let built = builder().analyzers(analyzers).build().expect("build");

    for _ in 0..10 {
        journal.lock().expect("lock").clear();
        let result = built
            .pipeline
            .process_single(&path, &CancellationToken::new())
            .await
            .expect("scan");

        assert_eq!(*journal.lock().expect("lock"), vec!["p5", "p10", "p15"]);
        let names: Vec<_> = result
            .analysis_outcomes
            .iter()
            .map(|outcome| outcome.analyzer_name.as_str())
            .collect();
        assert_eq!(names, vec!["p5", "p10", "p15"]);
    }
    assert_eq!(gauge.peak(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequential_phase_runs_before_parallel_phase() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_log(dir.path(), "crash.log", &crash_log(3));
    let journal = Arc::new(Mutex::new(Vec::new()));

    let built = builder()
        .analyzer(Arc::new(
            RecordingAnalyzer::new("parallel-a", 1, true)
                .journal(Arc::clone(&journal)),
        ))
        .analyzer(Arc::new(
            RecordingAnalyzer::new("parallel-b", 2, true)
                .journal(Arc::clone(&journal)),
        ))
        .analyzer(Arc::new(
            RecordingAnalyzer::new("sequential", 50, false)
                .journal(Arc::clone(&journal)),
        ))
        .build()
        .expect("build");

    let result = built
        .pipeline
        .process_single(&path, &CancellationToken::new())
        .await
        .expect("scan");

    let journal = journal.lock().expect("lock");
    assert_eq!(journal[0], "sequential");
    assert_eq!(journal.len(), 3);
    assert_eq!(result.analysis_outcomes[0].analyzer_name, "sequential");
    assert_eq!(result.analysis_outcomes.len(), 3);
}

#[tokio::test]
async fn analyzer_failure_is_isolated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_log(dir.path(), "crash.log", &crash_log(4));
    let built = builder()
        .analyzer(Arc::new(RecordingAnalyzer::new("broken", 1, false).failing()))
        .analyzer(Arc::new(RecordingAnalyzer::new("fine", 2, true)))
        .build()
        .expect("build");

    let result = built
        .pipeline
        .process_single(&path, &CancellationToken::new())
        .await
        .expect("scan");

    assert_eq!(result.status, ScanStatus::CompletedWithErrors);
    let broken = result.outcome("broken").expect("broken outcome");
    assert!(!broken.succeeded);
    assert_eq!(broken.errors, vec!["broken exploded".to_string()]);
    assert!(result.outcome("fine").is_some_and(|outcome| outcome.succeeded));
}

#[tokio::test]
async fn cancelled_before_start_returns_cancellation() {
    let built = builder().with_default_analyzers().build().expect("build");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = built
        .pipeline
        .process_single(Path::new("irrelevant.log"), &cancel)
        .await
        .expect_err("cancelled");
    assert!(matches!(err, ScanError::Cancelled));
}

/// Parser that gives up because the scan was cancelled while reading.
#[derive(Debug)]
struct InterruptedParser;

#[async_trait]
impl LogParser for InterruptedParser {
    async fn parse(
        &self,
        _path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ParsedLog, ParseError> {
        cancel.cancel();
        Err(ParseError::Cancelled)
    }
}

#[tokio::test]
async fn cancellation_during_parse_completes_the_file_for_observers() {
    let reporter = Arc::new(ProgressReporter::new(|_info| {}));
    let built = builder()
        .parser(Arc::new(InterruptedParser))
        .observer(reporter.clone())
        .with_default_analyzers()
        .build()
        .expect("build");

    let err = built
        .pipeline
        .process_single(Path::new("crash.log"), &CancellationToken::new())
        .await
        .expect_err("cancelled while parsing");

    assert!(matches!(err, ScanError::Cancelled));
    let snapshot = reporter.snapshot();
    assert_eq!(snapshot.current_file_status, Some(ScanStatus::Cancelled));
    assert_eq!(snapshot.processed_files, 1);
}

#[tokio::test]
async fn cancellation_mid_scan_marks_result_cancelled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_log(dir.path(), "crash.log", &crash_log(5));
    let later = Arc::new(RecordingAnalyzer::new("later", 20, false));
    let built = builder()
        .analyzer(Arc::new(
            RecordingAnalyzer::new("trigger", 10, false).cancelling(),
        ))
        .analyzer(later.clone())
        .build()
        .expect("build");

    let result = built
        .pipeline
        .process_single(&path, &CancellationToken::new())
        .await
        .expect("result with cancelled status");

    assert_eq!(result.status, ScanStatus::Cancelled);
    assert_eq!(result.analysis_outcomes.len(), 1);
    assert_eq!(later.calls(), 0);
}

#[tokio::test]
async fn identical_content_is_analyzed_once_with_caching() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = write_log(dir.path(), "first.log", &crash_log(9));
    let second = write_log(dir.path(), "second.log", &crash_log(9));
    let sequential = Arc::new(RecordingAnalyzer::new("seq", 1, false));
    let parallel = Arc::new(RecordingAnalyzer::new("par", 2, true));

    let built = builder()
        .caching(true)
        .analyzer(sequential.clone())
        .analyzer(parallel.clone())
        .build()
        .expect("build");

    let cancel = CancellationToken::new();
    for path in [&first, &first, &second] {
        let result = built
            .pipeline
            .process_single(path, &cancel)
            .await
            .expect("scan");
        assert_eq!(result.status, ScanStatus::Completed);
        assert_eq!(result.analysis_outcomes.len(), 2);
    }

    assert_eq!(sequential.calls(), 1);
    assert_eq!(parallel.calls(), 1);
    assert_eq!(built.cache_stats().hits, 4);
}

#[tokio::test]
async fn without_caching_every_scan_reruns_analyzers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_log(dir.path(), "crash.log", &crash_log(2));
    let analyzer = Arc::new(RecordingAnalyzer::new("marker", 1, true));
    let built = builder()
        .analyzer(analyzer.clone())
        .build()
        .expect("build");

    let cancel = CancellationToken::new();
    for _ in 0..2 {
        built
            .pipeline
            .process_single(&path, &cancel)
            .await
            .expect("scan");
    }
    assert_eq!(analyzer.calls(), 2);
}
