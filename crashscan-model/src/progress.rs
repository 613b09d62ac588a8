use std::time::Duration;

use crate::chrono::{DateTime, Utc};
use crate::result::ScanStatus;

/// Percentage of `processed` over `total`, `0.0` for an empty batch.
pub fn percent_of(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (processed as f64) * 100.0 / (total as f64)
}

fn per_second(count: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        0.0
    } else {
        (count as f64) / secs
    }
}

/// Batch-level progress, re-emitted after every completed file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchProgressSnapshot {
    pub total_files: usize,
    pub processed_files: usize,
    pub successful_scans: usize,
    pub failed_scans: usize,
    pub elapsed: Duration,
}

impl BatchProgressSnapshot {
    pub fn percentage(&self) -> f64 {
        percent_of(self.processed_files, self.total_files)
    }

    pub fn throughput(&self) -> f64 {
        per_second(self.processed_files, self.elapsed)
    }

    pub fn is_complete(&self) -> bool {
        self.processed_files >= self.total_files
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnalyzerRunStatus {
    Running,
    Succeeded,
    Failed,
}

/// One analyzer execution tracked by the progress reporter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveAnalyzer {
    pub analyzer_name: String,
    pub file_name: String,
    pub status: AnalyzerRunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

/// Fine grained progress snapshot emitted on every lifecycle event.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetailedProgressInfo {
    pub total_files: usize,
    pub processed_files: usize,
    pub successful_files: usize,
    pub failed_files: usize,
    pub current_file: Option<String>,
    pub current_file_status: Option<ScanStatus>,
    /// Analyzer executions in flight when the snapshot was taken.
    pub active_analyzers: Vec<ActiveAnalyzer>,
    /// The execution whose completion produced this snapshot, if any.
    pub last_finished: Option<ActiveAnalyzer>,
    pub elapsed: Duration,
}

impl DetailedProgressInfo {
    pub fn percentage(&self) -> f64 {
        percent_of(self.processed_files, self.total_files)
    }

    /// Files per second since the reporter started.
    pub fn throughput(&self) -> f64 {
        per_second(self.processed_files, self.elapsed)
    }
}
