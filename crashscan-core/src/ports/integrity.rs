use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use crashscan_model::IntegrityOutcome;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Verifies a game installation (FCX mode).
#[async_trait]
pub trait IntegrityChecker: Send + Sync + fmt::Debug {
    async fn check_game_integrity(
        &self,
        game_path: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<IntegrityOutcome>;
}
