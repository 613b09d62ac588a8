//! Aggregates lifecycle events into [`DetailedProgressInfo`] snapshots.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use crashscan_model::chrono::Utc;
use crashscan_model::{
    ActiveAnalyzer, AnalyzerRunStatus, DetailedProgressInfo, ScanStatus,
};
use tracing::trace;

use crate::ports::ScanObserver;

type DetailedSink = Box<dyn Fn(DetailedProgressInfo) + Send + Sync>;

#[derive(Default)]
struct Window {
    current_file: Option<String>,
    current_file_status: Option<ScanStatus>,
    active: Vec<(ActiveAnalyzer, Instant)>,
    batch_started: Option<Instant>,
}

/// Thread-safe progress aggregator.
///
/// Counters are atomics; the active-analyzer window sits behind a mutex.
/// Every event emits a fresh snapshot to the registered sink. A batch start
/// resets the counters and elapsed time, so one reporter can follow many
/// batches.
pub struct ProgressReporter {
    total_files: AtomicUsize,
    processed_files: AtomicUsize,
    successful_files: AtomicUsize,
    failed_files: AtomicUsize,
    window: Mutex<Window>,
    created: Instant,
    sink: DetailedSink,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("total_files", &self.total_files.load(Ordering::Relaxed))
            .field(
                "processed_files",
                &self.processed_files.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl ProgressReporter {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(DetailedProgressInfo) + Send + Sync + 'static,
    {
        Self {
            total_files: AtomicUsize::new(0),
            processed_files: AtomicUsize::new(0),
            successful_files: AtomicUsize::new(0),
            failed_files: AtomicUsize::new(0),
            window: Mutex::new(Window::default()),
            created: Instant::now(),
            sink: Box::new(sink),
        }
    }

    pub fn set_total_files(&self, total: usize) {
        self.total_files.store(total, Ordering::Relaxed);
    }

    /// Snapshot of the current state without emitting it.
    pub fn snapshot(&self) -> DetailedProgressInfo {
        let window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        self.build(&window, None)
    }

    fn build(
        &self,
        window: &Window,
        last_finished: Option<ActiveAnalyzer>,
    ) -> DetailedProgressInfo {
        DetailedProgressInfo {
            total_files: self.total_files.load(Ordering::Acquire),
            processed_files: self.processed_files.load(Ordering::Acquire),
            successful_files: self.successful_files.load(Ordering::Acquire),
            failed_files: self.failed_files.load(Ordering::Acquire),
            current_file: window.current_file.clone(),
            current_file_status: window.current_file_status,
            active_analyzers: window
                .active
                .iter()
                .map(|(entry, _)| entry.clone())
                .collect(),
            last_finished,
            elapsed: window
                .batch_started
                .unwrap_or(self.created)
                .elapsed(),
        }
    }

    fn emit<F>(&self, update: F)
    where
        F: FnOnce(&mut Window) -> Option<ActiveAnalyzer>,
    {
        let info = {
            let mut window =
                self.window.lock().unwrap_or_else(PoisonError::into_inner);
            let finished = update(&mut window);
            self.build(&window, finished)
        };
        trace!(
            target: "scan::progress",
            processed = info.processed_files,
            total = info.total_files,
            active = info.active_analyzers.len(),
            "progress updated"
        );
        (self.sink)(info);
    }
}

impl ScanObserver for ProgressReporter {
    fn batch_started(&self, total_files: usize) {
        self.emit(|window| {
            self.total_files.store(total_files, Ordering::Release);
            self.processed_files.store(0, Ordering::Release);
            self.successful_files.store(0, Ordering::Release);
            self.failed_files.store(0, Ordering::Release);
            *window = Window {
                batch_started: Some(Instant::now()),
                ..Window::default()
            };
            None
        });
    }

    fn file_started(&self, path: &Path) {
        self.emit(|window| {
            window.current_file = Some(file_name(path));
            window.current_file_status = Some(ScanStatus::InProgress);
            None
        });
    }

    fn file_completed(&self, path: &Path, status: ScanStatus) {
        if status.is_success() {
            self.successful_files.fetch_add(1, Ordering::AcqRel);
        } else {
            self.failed_files.fetch_add(1, Ordering::AcqRel);
        }
        self.processed_files.fetch_add(1, Ordering::AcqRel);

        self.emit(|window| {
            window.current_file = Some(file_name(path));
            window.current_file_status = Some(status);
            None
        });
    }

    fn analyzer_started(&self, analyzer: &str, path: &Path) {
        self.emit(|window| {
            window.active.push((
                ActiveAnalyzer {
                    analyzer_name: analyzer.to_owned(),
                    file_name: file_name(path),
                    status: AnalyzerRunStatus::Running,
                    started_at: Utc::now(),
                    ended_at: None,
                    duration: None,
                },
                Instant::now(),
            ));
            None
        });
    }

    fn analyzer_completed(&self, analyzer: &str, path: &Path, succeeded: bool) {
        let file = file_name(path);
        self.emit(|window| {
            let idx = window.active.iter().position(|(entry, _)| {
                entry.analyzer_name == analyzer && entry.file_name == file
            })?;
            let (mut entry, started) = window.active.remove(idx);
            entry.status = if succeeded {
                AnalyzerRunStatus::Succeeded
            } else {
                AnalyzerRunStatus::Failed
            };
            entry.ended_at = Some(Utc::now());
            entry.duration = Some(started.elapsed());
            Some(entry)
        });
    }
}
