use std::path::PathBuf;

use crashscan_model::GameVariant;

use crate::config::{CacheConfig, ExecutorConfig, RetryConfig};

/// Read-only source of the settings consumed when a pipeline is built.
pub trait SettingsProvider: Send + Sync {
    fn fcx_mode(&self) -> bool;

    fn game_path(&self) -> Option<PathBuf>;

    fn max_concurrency(&self) -> usize;

    fn game(&self) -> GameVariant {
        GameVariant::default()
    }

    fn caching(&self) -> bool {
        true
    }

    fn enhanced_error_handling(&self) -> bool {
        true
    }

    fn performance_monitoring(&self) -> bool {
        false
    }

    fn retry(&self) -> RetryConfig {
        RetryConfig::default()
    }

    fn cache(&self) -> CacheConfig {
        CacheConfig::default()
    }

    fn executor(&self) -> ExecutorConfig {
        ExecutorConfig::default()
    }
}
