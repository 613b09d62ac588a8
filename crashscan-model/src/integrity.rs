use std::path::PathBuf;

use crate::chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegrityStatus {
    Good,
    Warning,
    Critical,
    Invalid,
    #[default]
    Unknown,
}

impl IntegrityStatus {
    pub fn is_critical(self) -> bool {
        matches!(self, IntegrityStatus::Critical)
    }

    pub fn is_good(self) -> bool {
        matches!(self, IntegrityStatus::Good)
    }
}

/// Result of checking a game installation's files.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntegrityOutcome {
    pub status: IntegrityStatus,
    pub game_path: Option<PathBuf>,
    pub messages: Vec<String>,
    /// Hex encoded SHA-256 of the game executable, when it could be read.
    pub executable_digest: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl IntegrityOutcome {
    pub fn new(status: IntegrityStatus, game_path: Option<PathBuf>) -> Self {
        Self {
            status,
            game_path,
            messages: Vec::new(),
            executable_digest: None,
            checked_at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}
