//! Boundary contracts the pipeline consumes.
//!
//! Parsing, analysis, integrity checking, user messaging and settings all
//! live behind these traits so the orchestration core never depends on a
//! concrete implementation.

pub mod analyzer;
pub mod integrity;
pub mod message;
pub mod observer;
pub mod parser;
pub mod progress;
pub mod settings;

pub use analyzer::{Analyzer, SharedAnalyzer};
pub use integrity::IntegrityChecker;
pub use message::{MessageSink, NullMessageSink, TracingMessageSink};
pub use observer::{NoopObserver, ScanObserver};
pub use parser::LogParser;
pub use progress::{ProgressSink, WatchProgressSink};
pub use settings::SettingsProvider;
