mod support;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crashscan_core::ports::{ProgressSink, WatchProgressSink};
use crashscan_core::{
    PipelineBuilder, ProgressReporter, ScanError, ScanOptions,
};
use crashscan_model::{BatchProgressSnapshot, ScanStatus};
use futures::StreamExt;
use support::{ConcurrencyGauge, RecordingAnalyzer, write_logs};
use tokio_util::sync::CancellationToken;

fn builder() -> PipelineBuilder {
    PipelineBuilder::new()
        .caching(false)
        .enhanced_error_handling(false)
}

#[tokio::test]
async fn duplicate_paths_yield_one_result_each() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write_logs(dir.path(), 3);
    let analyzer = Arc::new(RecordingAnalyzer::new("marker", 1, true));
    let built = builder()
        .analyzer(analyzer.clone())
        .build()
        .expect("build");

    // N = 7 inputs, M = 5 of them the same path.
    let repeated = logs[0].clone();
    let paths = vec![
        repeated.clone(),
        logs[1].clone(),
        repeated.clone(),
        repeated.clone(),
        logs[2].clone(),
        repeated.clone(),
        repeated,
    ];

    let results: Vec<_> = built
        .pipeline
        .process_batch(
            paths,
            ScanOptions::default().with_max_concurrency(2),
            None,
            CancellationToken::new(),
        )
        .collect()
        .await;

    assert_eq!(results.len(), 7 - 5 + 1);
    let mut seen: Vec<PathBuf> = results
        .into_iter()
        .map(|result| result.expect("scan").log_path)
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 3);
    assert_eq!(analyzer.calls(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_files_never_exceed_max_concurrency() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write_logs(dir.path(), 16);

    for limit in [1, 3] {
        let gauge = Arc::new(ConcurrencyGauge::default());
        let built = builder()
            .analyzer(Arc::new(
                RecordingAnalyzer::new("slow", 1, true)
                    .delay(Duration::from_millis(10))
                    .gauge(Arc::clone(&gauge)),
            ))
            .build()
            .expect("build");

        let results: Vec<_> = built
            .pipeline
            .process_batch(
                logs.clone(),
                ScanOptions::default().with_max_concurrency(limit),
                None,
                CancellationToken::new(),
            )
            .collect()
            .await;

        assert_eq!(results.len(), 16);
        assert!(
            (1..=limit).contains(&gauge.peak()),
            "limit {limit}, peak {}",
            gauge.peak()
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequential_phases_of_different_files_overlap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write_logs(dir.path(), 4);
    let built = builder()
        .analyzer(Arc::new(
            RecordingAnalyzer::new("heavy", 1, false)
                .blocking(Duration::from_millis(200)),
        ))
        .build()
        .expect("build");

    let started = Instant::now();
    let results: Vec<_> = built
        .pipeline
        .process_batch(
            logs,
            ScanOptions::default().with_max_concurrency(4),
            None,
            CancellationToken::new(),
        )
        .collect()
        .await;

    assert_eq!(results.len(), 4);
    assert!(
        started.elapsed() < Duration::from_millis(600),
        "files were scanned one after another: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn batch_stream_terminates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write_logs(dir.path(), 3);
    let built = builder()
        .with_default_analyzers()
        .build()
        .expect("build");

    let mut stream = built.pipeline.process_batch(
        logs,
        ScanOptions::default(),
        None,
        CancellationToken::new(),
    );
    let mut yielded = 0;
    while let Some(item) =
        tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("batch stream stalled")
    {
        item.expect("scan");
        yielded += 1;
    }
    assert_eq!(yielded, 3);
}

#[tokio::test]
async fn reporter_reaches_full_progress_with_duplicate_inputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write_logs(dir.path(), 2);
    let reporter = Arc::new(ProgressReporter::new(|_info| {}));
    let built = builder()
        .with_default_analyzers()
        .observer(reporter.clone())
        .build()
        .expect("build");

    for _ in 0..2 {
        let paths = vec![logs[0].clone(), logs[1].clone(), logs[0].clone()];
        let _: Vec<_> = built
            .pipeline
            .process_batch(
                paths,
                ScanOptions::default(),
                None,
                CancellationToken::new(),
            )
            .collect()
            .await;

        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.total_files, 2);
        assert_eq!(snapshot.processed_files, 2);
        assert_eq!(snapshot.percentage(), 100.0);
    }
}

#[tokio::test]
async fn zero_concurrency_is_treated_as_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write_logs(dir.path(), 4);
    let gauge = Arc::new(ConcurrencyGauge::default());
    let built = builder()
        .analyzer(Arc::new(
            RecordingAnalyzer::new("slow", 1, true)
                .delay(Duration::from_millis(2))
                .gauge(Arc::clone(&gauge)),
        ))
        .build()
        .expect("build");

    let results: Vec<_> = built
        .pipeline
        .process_batch(
            logs,
            ScanOptions::default().with_max_concurrency(0),
            None,
            CancellationToken::new(),
        )
        .collect()
        .await;

    assert_eq!(results.len(), 4);
    assert_eq!(gauge.peak(), 1);
}

#[tokio::test]
async fn cancelling_after_five_results_stops_the_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write_logs(dir.path(), 100);
    let built = builder()
        .analyzer(Arc::new(
            RecordingAnalyzer::new("slow", 1, true)
                .delay(Duration::from_millis(2)),
        ))
        .build()
        .expect("build");

    let cancel = CancellationToken::new();
    let mut stream = built.pipeline.process_batch(
        logs,
        ScanOptions::default().with_max_concurrency(4),
        None,
        cancel.clone(),
    );

    let mut yielded = 0;
    let mut cancelled = false;
    while let Some(item) = stream.next().await {
        match item {
            Ok(result) => {
                assert!(result.status.is_success());
                yielded += 1;
                if yielded == 5 {
                    cancel.cancel();
                }
            }
            Err(err) => {
                assert!(matches!(err, ScanError::Cancelled));
                cancelled = true;
            }
        }
    }

    assert!(cancelled);
    assert!(yielded >= 5);
    assert!(yielded < 100);
}

#[tokio::test]
async fn progress_reaches_one_hundred_percent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut paths = write_logs(dir.path(), 3);
    paths.push(dir.path().join("missing.log"));
    let built = builder()
        .analyzer(Arc::new(RecordingAnalyzer::new("marker", 1, true)))
        .build()
        .expect("build");

    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&snapshots);
    let sink: Arc<dyn ProgressSink> =
        Arc::new(move |snapshot: BatchProgressSnapshot| {
            recorded.lock().expect("lock").push(snapshot);
        });

    let results: Vec<_> = built
        .pipeline
        .process_batch(
            paths,
            ScanOptions::default(),
            Some(sink),
            CancellationToken::new(),
        )
        .collect()
        .await;

    let failed = results
        .iter()
        .filter(|result| {
            result
                .as_ref()
                .is_ok_and(|result| result.status == ScanStatus::Failed)
        })
        .count();
    assert_eq!(failed, 1);

    let snapshots = snapshots.lock().expect("lock");
    assert_eq!(snapshots.len(), 4);
    assert_eq!(snapshots[0].processed_files, 1);
    let last = snapshots.last().expect("final snapshot");
    assert_eq!(last.total_files, 4);
    assert_eq!(last.processed_files, 4);
    assert_eq!(last.successful_scans, 3);
    assert_eq!(last.failed_scans, 1);
    assert_eq!(last.percentage(), 100.0);
}

#[tokio::test]
async fn watch_sink_holds_latest_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let logs = write_logs(dir.path(), 2);
    let built = builder()
        .analyzer(Arc::new(RecordingAnalyzer::new("marker", 1, true)))
        .build()
        .expect("build");
    let (sink, rx) = WatchProgressSink::channel();
    let sink: Arc<dyn ProgressSink> = Arc::new(sink);

    let _: Vec<_> = built
        .pipeline
        .process_batch(
            logs,
            ScanOptions::default(),
            Some(sink),
            CancellationToken::new(),
        )
        .collect()
        .await;

    let latest = *rx.borrow();
    let latest = latest.expect("snapshot published");
    assert!(latest.is_complete());
    assert_eq!(latest.processed_files, 2);
}

#[tokio::test]
async fn empty_batch_completes_without_results() {
    let built = builder().build().expect("build");
    let results: Vec<_> = built
        .pipeline
        .process_batch(
            Vec::new(),
            ScanOptions::default(),
            None,
            CancellationToken::new(),
        )
        .collect()
        .await;
    assert!(results.is_empty());
}
