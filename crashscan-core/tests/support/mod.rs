#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use crashscan_core::error::{AnalyzerError, Result};
use crashscan_core::ports::{Analyzer, IntegrityChecker, MessageSink};
use crashscan_model::{
    AnalysisOutcome, IntegrityOutcome, IntegrityStatus, MessageLevel,
    ParsedLog,
};
use tokio_util::sync::CancellationToken;

/// A well-formed crash log whose content is unique per `seed`.
pub fn crash_log(seed: usize) -> String {
    format!(
        "Buffout 4 v1.26.2\n\
         \n\
         Unhandled exception \"EXCEPTION_ACCESS_VIOLATION\" at 0x7FF6A1B2{seed:04X} Fallout4.exe+1B2{seed:04X}\n\
         \n\
         PROBABLE CALL STACK:\n\
         \t[0] 0x7FF6A1B2C3D4 Fallout4.exe+1B2C3D4\n\
         \t[1] 0x7FFB12345678 f4se_1_10_163.dll+0012345\n\
         \n\
         PLUGINS:\n\
         \t[00]     Fallout4.esm\n\
         \t[01]     DLCRobot.esm\n\
         \t[FE:000] ArmorKeywords.esl\n"
    )
}

pub fn write_log(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write crash log");
    path
}

pub fn write_logs(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|idx| write_log(dir, &format!("crash-{idx:03}.log"), &crash_log(idx)))
        .collect()
}

/// Tracks how many callers are inside a section at once.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Analyzer that records when it runs, how often, and with whom.
#[derive(Debug)]
pub struct RecordingAnalyzer {
    name: String,
    priority: i32,
    parallel: bool,
    delay: Duration,
    blocking: Duration,
    fail: bool,
    cancel_on_run: bool,
    journal: Arc<Mutex<Vec<String>>>,
    gauge: Arc<ConcurrencyGauge>,
    calls: AtomicUsize,
}

impl RecordingAnalyzer {
    pub fn new(name: &str, priority: i32, parallel: bool) -> Self {
        Self {
            name: name.to_owned(),
            priority,
            parallel,
            delay: Duration::ZERO,
            blocking: Duration::ZERO,
            fail: false,
            cancel_on_run: false,
            journal: Arc::new(Mutex::new(Vec::new())),
            gauge: Arc::new(ConcurrencyGauge::default()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Occupies the worker thread for `busy`, like CPU-bound analysis.
    pub fn blocking(mut self, busy: Duration) -> Self {
        self.blocking = busy;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Cancels the scan's token from inside the analyzer.
    pub fn cancelling(mut self) -> Self {
        self.cancel_on_run = true;
        self
    }

    pub fn journal(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = journal;
        self
    }

    pub fn gauge(mut self, gauge: Arc<ConcurrencyGauge>) -> Self {
        self.gauge = gauge;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for RecordingAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn parallelizable(&self) -> bool {
        self.parallel
    }

    async fn analyze(
        &self,
        _log: &ParsedLog,
        cancel: &CancellationToken,
    ) -> std::result::Result<AnalysisOutcome, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gauge.enter();
        self.journal
            .lock()
            .expect("journal lock")
            .push(self.name.clone());

        if !self.blocking.is_zero() {
            std::thread::sleep(self.blocking);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.gauge.exit();

        if self.cancel_on_run {
            cancel.cancel();
        }
        if self.fail {
            return Err(AnalyzerError::Fatal(format!("{} exploded", self.name)));
        }
        Ok(AnalysisOutcome::success(self.name.clone())
            .with_report_line(format!("{} ran", self.name)))
    }
}

/// Integrity checker returning a fixed status after an optional delay.
#[derive(Debug)]
pub struct StubChecker {
    status: IntegrityStatus,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubChecker {
    pub fn new(status: IntegrityStatus) -> Self {
        Self {
            status,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntegrityChecker for StubChecker {
    async fn check_game_integrity(
        &self,
        game_path: Option<&Path>,
        _cancel: &CancellationToken,
    ) -> Result<IntegrityOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(IntegrityOutcome::new(self.status, game_path.map(Path::to_path_buf))
            .with_message(format!("stub status {:?}", self.status)))
    }
}

/// Message sink that keeps everything it is shown.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(MessageLevel, String)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.messages.lock().expect("sink lock").clone()
    }
}

impl MessageSink for RecordingSink {
    fn show(&self, level: MessageLevel, text: &str) {
        self.messages
            .lock()
            .expect("sink lock")
            .push((level, text.to_owned()));
    }
}
