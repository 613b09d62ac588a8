use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::log::ParsedLog;
use crate::outcome::AnalysisOutcome;

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    CompletedWithErrors,
    Failed,
    Cancelled,
}

impl ScanStatus {
    /// Status of a file whose log parsed, derived from its analyzer outcomes.
    pub fn from_outcomes(outcomes: &[AnalysisOutcome]) -> Self {
        if outcomes.iter().all(|outcome| outcome.succeeded) {
            ScanStatus::Completed
        } else {
            ScanStatus::CompletedWithErrors
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ScanStatus::Pending | ScanStatus::InProgress)
    }

    /// Parsing succeeded and every analyzer ran, with or without errors.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ScanStatus::Completed | ScanStatus::CompletedWithErrors
        )
    }
}

/// Outcome of scanning a single crash log.
///
/// A `Failed` result never carries a parsed log.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanResult {
    pub log_path: PathBuf,
    pub status: ScanStatus,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub parsed_log: Option<Arc<ParsedLog>>,
    pub analysis_outcomes: Vec<AnalysisOutcome>,
    pub error_messages: Vec<String>,
    pub processing_time: Duration,
}

impl ScanResult {
    pub fn pending(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            status: ScanStatus::Pending,
            parsed_log: None,
            analysis_outcomes: Vec::new(),
            error_messages: Vec::new(),
            processing_time: Duration::ZERO,
        }
    }

    pub fn failed(
        log_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: ScanStatus::Failed,
            error_messages: vec![message.into()],
            ..Self::pending(log_path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    pub fn outcome(&self, analyzer_name: &str) -> Option<&AnalysisOutcome> {
        self.analysis_outcomes
            .iter()
            .find(|outcome| outcome.analyzer_name == analyzer_name)
    }

    pub fn failed_outcomes(&self) -> impl Iterator<Item = &AnalysisOutcome> {
        self.analysis_outcomes
            .iter()
            .filter(|outcome| !outcome.succeeded)
    }

    pub fn has_findings(&self) -> bool {
        self.analysis_outcomes
            .iter()
            .any(|outcome| outcome.has_findings)
    }

    /// Appends an outcome produced outside the analyzer phases, degrading a
    /// `Completed` status when the outcome failed.
    pub fn merge_outcome(&mut self, outcome: AnalysisOutcome) {
        if !outcome.succeeded && self.status == ScanStatus::Completed {
            self.status = ScanStatus::CompletedWithErrors;
        }
        self.analysis_outcomes.push(outcome);
    }
}
