use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use crashscan_model::{AnalysisOutcome, ParsedLog};
use tokio_util::sync::CancellationToken;

use crate::error::AnalyzerError;

/// A named, priority-ordered unit of work run against a parsed crash log.
#[async_trait]
pub trait Analyzer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Lower priorities run earlier within the sequential phase.
    fn priority(&self) -> i32;

    /// Whether the analyzer may run concurrently with the other analyzers of
    /// the same file scan.
    fn parallelizable(&self) -> bool {
        true
    }

    /// Revision of the analyzer's logic. Part of the cache fingerprint, so
    /// bumping it invalidates previously memoized outcomes.
    fn revision(&self) -> u32 {
        1
    }

    async fn analyze(
        &self,
        log: &ParsedLog,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalyzerError>;
}

pub type SharedAnalyzer = Arc<dyn Analyzer>;
