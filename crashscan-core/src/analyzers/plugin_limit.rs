use async_trait::async_trait;
use crashscan_model::{AnalysisOutcome, ParsedLog};
use tokio_util::sync::CancellationToken;

use crate::error::AnalyzerError;
use crate::ports::Analyzer;

/// Full plugins the engine can address; slots `FE` and `FF` are reserved.
pub const FULL_PLUGIN_LIMIT: usize = 254;

/// Light plugins that fit in the `FE` slot.
pub const LIGHT_PLUGIN_LIMIT: usize = 4096;

/// Flags load orders that exceed the engine's plugin limits.
#[derive(Debug, Default, Clone, Copy)]
pub struct PluginLimitAnalyzer;

impl PluginLimitAnalyzer {
    pub const NAME: &'static str = "Plugin Limit";
}

#[async_trait]
impl Analyzer for PluginLimitAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        30
    }

    async fn analyze(
        &self,
        log: &ParsedLog,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let full = log.full_plugin_count();
        let light = log.light_plugin_count();
        let mut outcome = AnalysisOutcome::success(Self::NAME)
            .with_data("full_plugins", full.to_string())
            .with_data("light_plugins", light.to_string());

        if log.plugins.is_empty() {
            return Ok(outcome.with_error("plugin list missing from crash log"));
        }
        if full > FULL_PLUGIN_LIMIT {
            outcome = outcome.with_report_line(format!(
                "{full} full plugins loaded, the limit is {FULL_PLUGIN_LIMIT}. \
                 Merge or convert plugins to light plugins."
            ));
        }
        if light > LIGHT_PLUGIN_LIMIT {
            outcome = outcome.with_report_line(format!(
                "{light} light plugins loaded, the limit is \
                 {LIGHT_PLUGIN_LIMIT}."
            ));
        }
        Ok(outcome)
    }
}
