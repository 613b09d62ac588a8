//! Explicit analyzer registry keyed by game.

use std::sync::Arc;

use crashscan_model::GameVariant;

use super::{CallStackSuspectAnalyzer, MainErrorAnalyzer, PluginLimitAnalyzer};
use crate::ports::SharedAnalyzer;

/// Built-in analyzers for `game`, in ascending priority.
pub fn analyzers_for(game: GameVariant) -> Vec<SharedAnalyzer> {
    vec![
        Arc::new(MainErrorAnalyzer),
        Arc::new(CallStackSuspectAnalyzer::for_game(game)),
        Arc::new(PluginLimitAnalyzer),
    ]
}
