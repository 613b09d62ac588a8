//! Built-in analyzers and the per-game registry that assembles them.

mod call_stack;
mod main_error;
mod plugin_limit;
pub mod registry;

pub use call_stack::{CallStackSuspectAnalyzer, Suspect};
pub use main_error::MainErrorAnalyzer;
pub use plugin_limit::{
    FULL_PLUGIN_LIMIT, LIGHT_PLUGIN_LIMIT, PluginLimitAnalyzer,
};
pub use registry::analyzers_for;
