//! Settings loading and process-level tracing setup for crashscan.
//!
//! [`ScanSettings`] is the persisted configuration consumed by
//! `crashscan_core::PipelineBuilder::from_settings`; [`telemetry`] installs
//! the `tracing` subscriber the core logs through.

#![allow(missing_docs)]

pub mod settings;
pub mod telemetry;

pub use settings::{ScanSettings, ScanSettingsSource};
pub use telemetry::init_tracing;
