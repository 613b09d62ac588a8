use anyhow::{Context, anyhow, ensure};
use crashscan_core::config::{
    CacheConfig, ExecutorConfig, RetryConfig, ScanOptions,
};
use crashscan_core::ports::SettingsProvider;
use crashscan_model::GameVariant;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

pub const CONFIG_PATH_VAR: &str = "CRASHSCAN_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "CRASHSCAN_CONFIG_JSON";

const CANDIDATES: &[&str] = &[
    "crashscan.toml",
    "crashscan.json",
    "config/crashscan.toml",
    "config/crashscan.json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsFormat {
    Toml,
    Json,
}

impl SettingsFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" | "tml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn decode(self, contents: &str) -> anyhow::Result<ScanSettings> {
        match self {
            Self::Toml => Ok(toml::from_str(contents)?),
            Self::Json => Ok(serde_json::from_str(contents)?),
        }
    }

    fn sniff(contents: &str) -> anyhow::Result<ScanSettings> {
        Self::Toml.decode(contents).or_else(|toml_err| {
            Self::Json.decode(contents).map_err(|json_err| {
                anyhow!("neither TOML ({toml_err}) nor JSON ({json_err})")
            })
        })
    }
}

/// Where the loaded settings came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanSettingsSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Persisted scan settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Check the game installation alongside every batch.
    pub fcx_mode: bool,
    pub game: GameVariant,
    /// Root of the game installation, required for a meaningful FCX check.
    pub game_path: Option<PathBuf>,
    /// Crash logs scanned at the same time. Zero is raised to one.
    pub max_concurrency: usize,
    /// Memoize analyzer outcomes by log content.
    pub caching: bool,
    /// Retry transient analyzer failures with backoff.
    pub enhanced_error_handling: bool,
    pub performance_monitoring: bool,
    pub disable_progress: bool,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub executor: ExecutorConfig,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            fcx_mode: false,
            game: GameVariant::default(),
            game_path: None,
            max_concurrency: ScanOptions::default().max_concurrency,
            caching: true,
            enhanced_error_handling: true,
            performance_monitoring: false,
            disable_progress: false,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl ScanSettings {
    /// Load settings using environment variables.
    /// Evaluation order:
    /// 1) `$CRASHSCAN_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$CRASHSCAN_CONFIG_JSON` (inline JSON),
    /// 3) the first existing default file in the working directory,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ScanSettingsSource)> {
        Self::load_with(|key| env::var(key).ok(), Path::new("."))
    }

    /// Same order as [`ScanSettings::load_from_env`], reading variables
    /// through `lookup` and resolving default files against `base_dir`.
    pub fn load_with<F>(
        lookup: F,
        base_dir: &Path,
    ) -> anyhow::Result<(Self, ScanSettingsSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = lookup(CONFIG_PATH_VAR)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str.trim());
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, ScanSettingsSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_VAR)
            && !raw.trim().is_empty()
        {
            let parsed = SettingsFormat::Json
                .decode(&raw)
                .and_then(Self::validated)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            return Ok((parsed, ScanSettingsSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(base_dir) {
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, ScanSettingsSource::File(path)));
        }

        debug!("no crashscan settings found, using defaults");
        Ok((Self::default(), ScanSettingsSource::Default))
    }

    /// Reads a settings file, choosing the format from its extension and
    /// trying TOML then JSON when the extension says nothing.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read crashscan settings from {}", path.display())
        })?;
        let decoded = match SettingsFormat::from_path(path) {
            Some(format) => format.decode(&contents),
            None => SettingsFormat::sniff(&contents),
        };
        decoded.and_then(Self::validated).with_context(|| {
            format!("invalid crashscan settings in {}", path.display())
        })
    }

    /// Parses settings of unknown format.
    pub fn parse_from_str(contents: &str) -> anyhow::Result<Self> {
        SettingsFormat::sniff(contents).and_then(Self::validated)
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        SettingsFormat::Json.decode(raw).and_then(Self::validated)
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }

    /// Rejects settings the pipeline cannot honour and repairs the ones
    /// with an obvious intent.
    fn validated(mut self) -> anyhow::Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&self.retry.jitter_ratio),
            "retry.jitter_ratio must be within 0.0..=1.0, got {}",
            self.retry.jitter_ratio
        );
        if self.max_concurrency == 0 {
            warn!(
                "max_concurrency of 0 is not usable, scanning one file at a time"
            );
            self.max_concurrency = 1;
        }
        if self.retry.max_attempts == 0 {
            warn!("retry.max_attempts of 0 means one attempt per analyzer");
            self.retry.max_attempts = 1;
        }
        if self.retry.backoff_max_ms < self.retry.backoff_base_ms {
            warn!(
                base_ms = self.retry.backoff_base_ms,
                max_ms = self.retry.backoff_max_ms,
                "retry.backoff_max_ms below backoff_base_ms, raising it"
            );
            self.retry.backoff_max_ms = self.retry.backoff_base_ms;
        }
        if self.fcx_mode && self.game_path.is_none() {
            warn!(
                game = %self.game,
                "fcx_mode is on without game_path; integrity checks will \
                 report the installation as invalid"
            );
        }
        Ok(self)
    }

    /// Batch options derived from these settings.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_concurrency: self.max_concurrency,
            fcx_mode: self.fcx_mode,
            disable_progress: self.disable_progress,
        }
    }
}

impl SettingsProvider for ScanSettings {
    fn fcx_mode(&self) -> bool {
        self.fcx_mode
    }

    fn game_path(&self) -> Option<PathBuf> {
        self.game_path.clone()
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    fn game(&self) -> GameVariant {
        self.game
    }

    fn caching(&self) -> bool {
        self.caching
    }

    fn enhanced_error_handling(&self) -> bool {
        self.enhanced_error_handling
    }

    fn performance_monitoring(&self) -> bool {
        self.performance_monitoring
    }

    fn retry(&self) -> RetryConfig {
        self.retry
    }

    fn cache(&self) -> CacheConfig {
        self.cache
    }

    fn executor(&self) -> ExecutorConfig {
        self.executor
    }
}
