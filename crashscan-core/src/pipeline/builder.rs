use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crashscan_model::{AnalysisOutcome, GameVariant};
use tracing::debug;

use super::{
    AnalysisPipeline, IntegrityCheckPipeline, PerformanceMonitoringPipeline,
    PerformanceRecorder, ScanPipeline,
};
use crate::analyzers::analyzers_for;
use crate::cache::{CacheStats, InMemoryCacheStore, NoopCacheStore};
use crate::config::{CacheConfig, ExecutorConfig, RetryConfig, ScanOptions};
use crate::error::{Result, ScanError};
use crate::integrity::GameIntegrityChecker;
use crate::parser::CrashLogParser;
use crate::ports::{
    IntegrityChecker, LogParser, MessageSink, NoopObserver, ScanObserver,
    SettingsProvider, SharedAnalyzer, TracingMessageSink,
};
use crate::resilience::{
    DefaultErrorPolicy, ErrorPolicy, NoRetryPolicy, OutcomeCache,
    ResilientExecutor,
};

/// A freshly wired pipeline plus handles onto its instrumentation.
#[derive(Debug, Clone)]
pub struct BuiltPipeline {
    pub pipeline: Arc<dyn ScanPipeline>,
    /// Present when performance monitoring was enabled.
    pub performance: Option<Arc<PerformanceRecorder>>,
    executor: ResilientExecutor,
}

impl BuiltPipeline {
    pub fn cache_stats(&self) -> CacheStats {
        self.executor.cache_stats()
    }
}

/// Composes the pipeline chain from configuration.
///
/// Layering, innermost first: analysis core with its executor (caching and
/// retries when enabled), integrity check in FCX mode, then performance
/// monitoring. `build` may be called repeatedly; each call wires new
/// instances and shares nothing with earlier builds except the registered
/// analyzers, parser, checker and sinks.
pub struct PipelineBuilder {
    analyzers: Vec<SharedAnalyzer>,
    parser: Arc<dyn LogParser>,
    integrity_checker: Option<Arc<dyn IntegrityChecker>>,
    messages: Arc<dyn MessageSink>,
    observer: Arc<dyn ScanObserver>,
    game: GameVariant,
    game_path: Option<PathBuf>,
    max_concurrency: usize,
    caching: bool,
    enhanced_error_handling: bool,
    fcx_mode: bool,
    performance_monitoring: bool,
    retry: RetryConfig,
    cache: CacheConfig,
    executor: ExecutorConfig,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("analyzers", &self.analyzers.len())
            .field("game", &self.game)
            .field("game_path", &self.game_path)
            .field("caching", &self.caching)
            .field("enhanced_error_handling", &self.enhanced_error_handling)
            .field("fcx_mode", &self.fcx_mode)
            .field("performance_monitoring", &self.performance_monitoring)
            .finish_non_exhaustive()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            analyzers: Vec::new(),
            parser: Arc::new(CrashLogParser::new()),
            integrity_checker: None,
            messages: Arc::new(TracingMessageSink),
            observer: Arc::new(NoopObserver),
            game: GameVariant::default(),
            game_path: None,
            max_concurrency: ScanOptions::default().max_concurrency,
            caching: true,
            enhanced_error_handling: true,
            fcx_mode: false,
            performance_monitoring: false,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }

    /// Seeds flags, game, paths and tuning from a settings provider.
    pub fn from_settings(settings: &dyn SettingsProvider) -> Self {
        Self::new()
            .game(settings.game())
            .game_path(settings.game_path())
            .max_concurrency(settings.max_concurrency())
            .caching(settings.caching())
            .enhanced_error_handling(settings.enhanced_error_handling())
            .fcx_mode(settings.fcx_mode())
            .performance_monitoring(settings.performance_monitoring())
            .retry_config(settings.retry())
            .cache_config(settings.cache())
            .executor_config(settings.executor())
    }

    pub fn analyzer(mut self, analyzer: SharedAnalyzer) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    pub fn analyzers<I>(mut self, analyzers: I) -> Self
    where
        I: IntoIterator<Item = SharedAnalyzer>,
    {
        self.analyzers.extend(analyzers);
        self
    }

    /// Registers the built-in analyzers for the configured game.
    pub fn with_default_analyzers(self) -> Self {
        let game = self.game;
        self.analyzers(analyzers_for(game))
    }

    pub fn parser(mut self, parser: Arc<dyn LogParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn integrity_checker(
        mut self,
        checker: Arc<dyn IntegrityChecker>,
    ) -> Self {
        self.integrity_checker = Some(checker);
        self
    }

    pub fn message_sink(mut self, messages: Arc<dyn MessageSink>) -> Self {
        self.messages = messages;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn game(mut self, game: GameVariant) -> Self {
        self.game = game;
        self
    }

    pub fn game_path(mut self, game_path: Option<PathBuf>) -> Self {
        self.game_path = game_path;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn caching(mut self, enabled: bool) -> Self {
        self.caching = enabled;
        self
    }

    pub fn enhanced_error_handling(mut self, enabled: bool) -> Self {
        self.enhanced_error_handling = enabled;
        self
    }

    pub fn fcx_mode(mut self, enabled: bool) -> Self {
        self.fcx_mode = enabled;
        self
    }

    pub fn performance_monitoring(mut self, enabled: bool) -> Self {
        self.performance_monitoring = enabled;
        self
    }

    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache_config(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn executor_config(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Batch options matching the configured concurrency and FCX mode.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_concurrency: self.max_concurrency,
            fcx_mode: self.fcx_mode,
            ..ScanOptions::default()
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.analyzers.len());
        for analyzer in &self.analyzers {
            if !seen.insert(analyzer.name()) {
                return Err(ScanError::Configuration(format!(
                    "analyzer `{}` is registered more than once",
                    analyzer.name()
                )));
            }
        }
        Ok(())
    }

    fn build_executor(&self) -> ResilientExecutor {
        let policy: Arc<dyn ErrorPolicy> = if self.enhanced_error_handling {
            Arc::new(DefaultErrorPolicy::new(self.retry))
        } else {
            Arc::new(NoRetryPolicy)
        };
        let cache: Arc<OutcomeCache> = if self.caching {
            Arc::new(InMemoryCacheStore::<AnalysisOutcome>::new(self.cache))
        } else {
            Arc::new(NoopCacheStore)
        };
        ResilientExecutor::new(policy, cache)
            .with_timeout(self.executor.analyzer_timeout())
    }

    pub fn build(&self) -> Result<BuiltPipeline> {
        self.validate()?;

        let executor = self.build_executor();
        let mut pipeline: Arc<dyn ScanPipeline> = Arc::new(
            AnalysisPipeline::new(
                Arc::clone(&self.parser),
                self.analyzers.clone(),
                executor.clone(),
            )
            .with_observer(Arc::clone(&self.observer)),
        );

        if self.fcx_mode {
            let checker: Arc<dyn IntegrityChecker> =
                match &self.integrity_checker {
                    Some(checker) => Arc::clone(checker),
                    None => Arc::new(GameIntegrityChecker::new(self.game)),
                };
            pipeline = Arc::new(IntegrityCheckPipeline::new(
                pipeline,
                checker,
                self.game_path.clone(),
                Arc::clone(&self.messages),
            ));
        }

        let mut performance = None;
        if self.performance_monitoring {
            let recorder = Arc::new(PerformanceRecorder::new());
            performance = Some(Arc::clone(&recorder));
            pipeline =
                Arc::new(PerformanceMonitoringPipeline::new(pipeline, recorder));
        }

        debug!(
            target: "scan::pipeline",
            analyzers = self.analyzers.len(),
            caching = self.caching,
            enhanced_error_handling = self.enhanced_error_handling,
            fcx_mode = self.fcx_mode,
            performance_monitoring = self.performance_monitoring,
            "pipeline built"
        );

        Ok(BuiltPipeline {
            pipeline,
            performance,
            executor,
        })
    }
}
