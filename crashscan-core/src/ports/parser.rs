use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use crashscan_model::ParsedLog;
use tokio_util::sync::CancellationToken;

use crate::error::ParseError;

/// Turns a crash log on disk into a `ParsedLog`.
#[async_trait]
pub trait LogParser: Send + Sync + fmt::Debug {
    async fn parse(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ParsedLog, ParseError>;
}
