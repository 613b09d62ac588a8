//! Reference game installation checker used in FCX mode.

use std::path::Path;

use async_trait::async_trait;
use crashscan_model::{GameVariant, IntegrityOutcome, IntegrityStatus};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, ScanError};
use crate::ports::IntegrityChecker;

const HASH_CHUNK: usize = 64 * 1024;

/// Checks that the game executable and script extender loader are present,
/// and optionally that the executable matches a known SHA-256.
#[derive(Debug, Clone, Default)]
pub struct GameIntegrityChecker {
    game: GameVariant,
    expected_executable_sha256: Option<String>,
}

impl GameIntegrityChecker {
    pub fn new(game: GameVariant) -> Self {
        Self {
            game,
            expected_executable_sha256: None,
        }
    }

    pub fn with_expected_hash(mut self, sha256: impl Into<String>) -> Self {
        self.expected_executable_sha256 = Some(sha256.into().to_lowercase());
        self
    }

    pub fn game(&self) -> GameVariant {
        self.game
    }
}

async fn sha256_file(path: &Path, cancel: &CancellationToken) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await.map_err(|err| {
        ScanError::Integrity(format!("unable to open {}: {err}", path.display()))
    })?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK];
    loop {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        let read = file.read(&mut buf).await.map_err(|err| {
            ScanError::Integrity(format!(
                "unable to read {}: {err}",
                path.display()
            ))
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[async_trait]
impl IntegrityChecker for GameIntegrityChecker {
    async fn check_game_integrity(
        &self,
        game_path: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<IntegrityOutcome> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let Some(root) = game_path else {
            return Ok(IntegrityOutcome::new(IntegrityStatus::Invalid, None)
                .with_message("Game path is not configured"));
        };
        let root_buf = Some(root.to_path_buf());
        if !tokio::fs::metadata(root).await.is_ok_and(|meta| meta.is_dir()) {
            return Ok(IntegrityOutcome::new(IntegrityStatus::Invalid, root_buf)
                .with_message(format!(
                    "Game path {} is not a directory",
                    root.display()
                )));
        }

        let executable = root.join(self.game.executable_name());
        if !tokio::fs::try_exists(&executable).await.unwrap_or(false) {
            return Ok(IntegrityOutcome::new(IntegrityStatus::Critical, root_buf)
                .with_message(format!(
                    "{} is missing from {}",
                    self.game.executable_name(),
                    root.display()
                )));
        }

        let mut outcome = IntegrityOutcome::new(IntegrityStatus::Good, root_buf);
        let digest = sha256_file(&executable, cancel).await?;
        if let Some(expected) = &self.expected_executable_sha256
            && *expected != digest
        {
            outcome.status = IntegrityStatus::Warning;
            outcome = outcome.with_message(format!(
                "{} does not match the expected version",
                self.game.executable_name()
            ));
        }
        outcome.executable_digest = Some(digest);

        let loader = root.join(self.game.script_extender_loader());
        if !tokio::fs::try_exists(&loader).await.unwrap_or(false) {
            outcome.status = IntegrityStatus::Warning;
            outcome = outcome.with_message(format!(
                "{} is missing; script extender plugins will not load",
                self.game.script_extender_loader()
            ));
        }

        debug!(
            target: "scan::integrity",
            game = %self.game,
            status = ?outcome.status,
            "game installation checked"
        );
        Ok(outcome)
    }
}
