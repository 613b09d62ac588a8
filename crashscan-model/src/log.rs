use std::path::PathBuf;

use crate::chrono::{DateTime, Utc};

/// Tool that produced the crash log, taken from the log header.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrashGenerator {
    pub name: String,
    pub version: Option<String>,
}

/// One entry of the plugin load order listed in a crash log.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PluginEntry {
    /// Load order slot as printed, e.g. `0A` or `FE:001`.
    pub load_order: String,
    pub name: String,
    /// Light plugins share the `FE` slot and do not count towards the
    /// full-plugin limit.
    pub light: bool,
}

/// In-memory representation of one crash log.
///
/// Built once per file by a log parser and shared read-only with every
/// analyzer of that file's scan.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedLog {
    pub path: PathBuf,
    /// Hex encoded SHA-256 of the raw file contents.
    pub content_digest: String,
    pub lines: Vec<String>,
    pub main_error: Option<String>,
    pub call_stack: Vec<String>,
    pub plugins: Vec<PluginEntry>,
    pub generator: Option<CrashGenerator>,
    pub crashed_at: Option<DateTime<Utc>>,
    pub parsed_at: DateTime<Utc>,
}

impl ParsedLog {
    /// A log with raw lines only; the parser fills in the extracted parts.
    pub fn new(
        path: impl Into<PathBuf>,
        content_digest: impl Into<String>,
        lines: Vec<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content_digest: content_digest.into(),
            lines,
            main_error: None,
            call_stack: Vec::new(),
            plugins: Vec::new(),
            generator: None,
            crashed_at: None,
            parsed_at: Utc::now(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn full_plugin_count(&self) -> usize {
        self.plugins.iter().filter(|plugin| !plugin.light).count()
    }

    pub fn light_plugin_count(&self) -> usize {
        self.plugins.iter().filter(|plugin| plugin.light).count()
    }
}
