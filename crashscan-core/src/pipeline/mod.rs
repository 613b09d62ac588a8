//! Scan pipelines: the analyzer orchestration core, the batch processor, and
//! the decorators layered over them.
//!
//! Every layer implements [`ScanPipeline`]. Decorators hold an inner
//! pipeline and delegate to it, so the chain assembled by
//! [`PipelineBuilder`] can be extended without touching the core.

pub mod analysis;
pub mod batch;
pub mod builder;
pub mod integrity;
pub mod performance;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use crashscan_model::ScanResult;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::config::ScanOptions;
use crate::error::Result;
use crate::ports::ProgressSink;

pub use analysis::AnalysisPipeline;
pub use builder::{BuiltPipeline, PipelineBuilder};
pub use integrity::{
    INTEGRITY_ANALYZER_NAME, INTEGRITY_SENTINEL_PATH, IntegrityCheckPipeline,
};
pub use performance::{
    PerformanceMonitoringPipeline, PerformanceRecorder, PerformanceSnapshot,
};

/// Lazy, single-pass stream of per-file results.
pub type ScanResultStream<'a> = BoxStream<'a, Result<ScanResult>>;

#[async_trait]
pub trait ScanPipeline: Send + Sync + fmt::Debug {
    /// Scans one crash log.
    ///
    /// Ordinary failures are reported inside the returned [`ScanResult`];
    /// `Err` is reserved for cancellation and infrastructure faults.
    async fn process_single(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ScanResult>;

    /// Scans many crash logs under `options`, yielding each result as soon as
    /// its file finishes. The stream ends after the last admitted file; a
    /// cancelled batch ends with `Err(Cancelled)` after the results that
    /// completed normally.
    fn process_batch<'a>(
        &'a self,
        paths: Vec<PathBuf>,
        options: ScanOptions,
        progress: Option<Arc<dyn ProgressSink>>,
        cancel: CancellationToken,
    ) -> ScanResultStream<'a>;
}
