//! # crashscan core
//!
//! Scan orchestration for game crash logs: decides how and in what order
//! analyzers run against a log, how many logs are scanned at once, and how
//! failures are isolated, retried and cached.
//!
//! ## Architecture
//!
//! - [`ports`]: traits for the parser, analyzers, integrity checker, sinks
//!   and settings the core consumes
//! - [`pipeline`]: the analysis core, the batch processor, the integrity and
//!   performance decorators, and [`pipeline::PipelineBuilder`]
//! - [`resilience`]: error policies and the executor that wraps every
//!   analyzer invocation
//! - [`cache`]: content-keyed memoization with per-key singleflight
//! - [`progress`]: lifecycle event aggregation into progress snapshots
//!
//! Reference implementations of the consumed ports live in [`parser`],
//! [`analyzers`] and [`integrity`].
//!
//! ```no_run
//! use crashscan_core::{PipelineBuilder, ScanOptions};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(paths: Vec<std::path::PathBuf>) -> crashscan_core::Result<()> {
//! let built = PipelineBuilder::new().with_default_analyzers().build()?;
//! let mut results = built.pipeline.process_batch(
//!     paths,
//!     ScanOptions::default(),
//!     None,
//!     CancellationToken::new(),
//! );
//! while let Some(result) = results.next().await {
//!     let result = result?;
//!     println!("{}: {:?}", result.log_path.display(), result.status);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Built-in analyzers and the per-game registry
pub mod analyzers;
/// Content-keyed outcome cache
pub mod cache;
/// Tuning structs for batches, retries, caching and the executor
pub mod config;
/// Error taxonomy
pub mod error;
/// Reference game installation checker
pub mod integrity;
/// Reference crash-log parser
pub mod parser;
/// Pipeline layers and builder
pub mod pipeline;
/// Boundary traits
pub mod ports;
/// Progress aggregation
pub mod progress;
/// Error policies and the resilient executor
pub mod resilience;

pub use config::{CacheConfig, ExecutorConfig, RetryConfig, ScanOptions};
pub use error::{AnalyzerError, ParseError, Result, ScanError};
pub use pipeline::{BuiltPipeline, PipelineBuilder, ScanPipeline};
pub use progress::ProgressReporter;

pub use crashscan_model as model;
