use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced at or above the file boundary.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Integrity check error: {0}")]
    Integrity(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ScanError::Cancelled | ScanError::Parse(ParseError::Cancelled)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Reasons a crash log could not be turned into a `ParsedLog`.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a recognizable crash log: {}", .0.display())]
    Unrecognized(PathBuf),

    #[error("parsing cancelled")]
    Cancelled,
}

impl ParseError {
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ParseError::NotFound(path)
        } else {
            ParseError::Io { path, source }
        }
    }
}

/// Failure raised by a single analyzer invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// Worth retrying: the same input may succeed on a later attempt.
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(String),

    #[error("analyzer timed out after {0:?}")]
    Timeout(Duration),

    #[error("analyzer cancelled")]
    Cancelled,
}

impl AnalyzerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalyzerError::Cancelled)
    }
}
