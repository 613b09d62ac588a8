use std::path::Path;

use crashscan_model::ScanStatus;

/// Lifecycle hooks invoked by the pipeline core while scanning.
///
/// Implementations are called concurrently from every in-flight file scan
/// and from the parallel analyzer phase, so they synchronize internally.
pub trait ScanObserver: Send + Sync {
    /// A batch of `total_files` distinct files is about to be scanned.
    fn batch_started(&self, _total_files: usize) {}

    fn file_started(&self, _path: &Path) {}

    fn file_completed(&self, _path: &Path, _status: ScanStatus) {}

    fn analyzer_started(&self, _analyzer: &str, _path: &Path) {}

    fn analyzer_completed(
        &self,
        _analyzer: &str,
        _path: &Path,
        _succeeded: bool,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}
