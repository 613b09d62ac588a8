mod support;

use std::sync::{Arc, Mutex};

use crashscan_core::ports::{ProgressSink, WatchProgressSink};
use crashscan_core::{PipelineBuilder, ProgressReporter, ScanOptions};
use crashscan_model::{DetailedProgressInfo, GameVariant};
use futures::StreamExt;
use support::write_logs;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_logs_three_analyzers_two_slots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = write_logs(dir.path(), 3);

    let details = Arc::new(Mutex::new(Vec::<DetailedProgressInfo>::new()));
    let recorded = Arc::clone(&details);
    let reporter = Arc::new(ProgressReporter::new(move |info| {
        recorded.lock().expect("lock").push(info);
    }));

    let built = PipelineBuilder::new()
        .game(GameVariant::Fallout4)
        .with_default_analyzers()
        .performance_monitoring(true)
        .observer(reporter.clone())
        .build()
        .expect("build");

    let (sink, rx) = WatchProgressSink::channel();
    let sink: Arc<dyn ProgressSink> = Arc::new(sink);
    let options = ScanOptions {
        max_concurrency: 2,
        fcx_mode: false,
        disable_progress: false,
    };

    let results: Vec<_> = built
        .pipeline
        .process_batch(
            paths.clone(),
            options,
            Some(sink),
            CancellationToken::new(),
        )
        .collect()
        .await;

    assert_eq!(results.len(), 3);
    for result in &results {
        let result = result.as_ref().expect("scan");
        assert!(result.status.is_success(), "{:?}", result.status);
        assert!(paths.contains(&result.log_path));
        assert_eq!(result.analysis_outcomes.len(), 3);
        // The only sequential analyzer always reports first.
        assert_eq!(result.analysis_outcomes[0].analyzer_name, "Main Error");
    }

    let last = *rx.borrow();
    let last = last.expect("final snapshot");
    assert_eq!(last.total_files, 3);
    assert_eq!(last.processed_files, 3);
    assert_eq!(last.percentage(), 100.0);

    let final_detail = reporter.snapshot();
    assert_eq!(final_detail.processed_files, 3);
    assert_eq!(final_detail.successful_files, 3);
    assert!(final_detail.active_analyzers.is_empty());
    assert!(
        details
            .lock()
            .expect("lock")
            .iter()
            .any(|info| !info.active_analyzers.is_empty())
    );

    let performance = built
        .performance
        .as_ref()
        .expect("performance recorder")
        .snapshot();
    assert_eq!(performance.batch_calls, 1);
    assert_eq!(performance.files_observed, 3);
    assert!(performance.last_batch_elapsed.is_some());
}

#[tokio::test]
async fn rescanning_the_same_batch_hits_the_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = write_logs(dir.path(), 3);
    let built = PipelineBuilder::new()
        .with_default_analyzers()
        .build()
        .expect("build");

    for _ in 0..2 {
        let results: Vec<_> = built
            .pipeline
            .process_batch(
                paths.clone(),
                ScanOptions::default(),
                None,
                CancellationToken::new(),
            )
            .collect()
            .await;
        assert_eq!(results.len(), 3);
    }

    let stats = built.cache_stats();
    assert_eq!(stats.misses, 9);
    assert_eq!(stats.hits, 9);
}
