use async_trait::async_trait;
use crashscan_model::{AnalysisOutcome, ParsedLog};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::error::AnalyzerError;
use crate::ports::Analyzer;

static EXCEPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"Unhandled exception "(?P<code>[^"]+)" at (?P<addr>0x[0-9A-Fa-f]+)(?:\s+(?P<module>[^\s+]+)\+)?"#,
    )
    .unwrap_or_else(|err| unreachable!("invalid exception regex: {err}"))
});

/// Summarises the main error of the crash. Runs first so its report heads
/// the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct MainErrorAnalyzer;

impl MainErrorAnalyzer {
    pub const NAME: &'static str = "Main Error";
}

#[async_trait]
impl Analyzer for MainErrorAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        10
    }

    fn parallelizable(&self) -> bool {
        false
    }

    async fn analyze(
        &self,
        log: &ParsedLog,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let mut outcome = AnalysisOutcome::success(Self::NAME);
        if let Some(generator) = &log.generator {
            outcome = outcome.with_data("generator", &generator.name);
            if let Some(version) = &generator.version {
                outcome = outcome.with_data("generator_version", version);
            }
        }

        let Some(main_error) = log.main_error.as_deref() else {
            return Ok(outcome.with_error("no main error line found"));
        };

        outcome = outcome.with_report_line(format!("Main error: {main_error}"));
        if let Some(caps) = EXCEPTION_RE.captures(main_error) {
            outcome = outcome
                .with_data("exception", &caps["code"])
                .with_data("address", &caps["addr"]);
            if let Some(module) = caps.name("module") {
                outcome = outcome
                    .with_data("module", module.as_str())
                    .with_report_line(format!(
                        "Faulting module: {}",
                        module.as_str()
                    ));
            }
        }
        Ok(outcome)
    }
}
