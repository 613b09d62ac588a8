//! Core data model definitions shared across crashscan crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod game;
pub mod integrity;
pub mod log;
pub mod message;
pub mod outcome;
pub mod progress;
pub mod result;

pub use game::GameVariant;
pub use integrity::{IntegrityOutcome, IntegrityStatus};
pub use log::{CrashGenerator, ParsedLog, PluginEntry};
pub use message::MessageLevel;
pub use outcome::AnalysisOutcome;
pub use progress::{
    ActiveAnalyzer, AnalyzerRunStatus, BatchProgressSnapshot,
    DetailedProgressInfo, percent_of,
};
pub use result::{ScanResult, ScanStatus};
