//! Failure isolation around analyzer invocations.

mod executor;
mod policy;

pub use executor::{OutcomeCache, ResilientExecutor};
pub use policy::{DefaultErrorPolicy, ErrorPolicy, NoRetryPolicy};
