//! Reference crash-log parser.
//!
//! Understands the common section layout of script-extender crash logs:
//! a generator header, an `Unhandled exception` line, and the
//! `PROBABLE CALL STACK:` and `PLUGINS:` sections. Anything else is kept as
//! raw lines for analyzers to inspect.

use std::path::Path;

use async_trait::async_trait;
use crashscan_model::chrono::{DateTime, Utc};
use crashscan_model::{CrashGenerator, ParsedLog, PluginEntry};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::ParseError;
use crate::ports::LogParser;

const CALL_STACK_HEADER: &str = "PROBABLE CALL STACK:";
const PLUGINS_HEADER: &str = "PLUGINS:";

static GENERATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+?)\s+v(?P<version>\d[\w.\-]*)\s*$")
        .unwrap_or_else(|err| unreachable!("invalid generator regex: {err}"))
});

static PLUGIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*\[(?P<slot>[0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{3})?)\]\s+(?P<name>.+?)\s*$",
    )
    .unwrap_or_else(|err| unreachable!("invalid plugin regex: {err}"))
});

#[derive(Debug, Default, Clone, Copy)]
pub struct CrashLogParser;

impl CrashLogParser {
    pub fn new() -> Self {
        Self
    }

    /// Builds a `ParsedLog` from already loaded contents.
    pub fn parse_contents(
        &self,
        path: &Path,
        bytes: &[u8],
    ) -> Result<ParsedLog, ParseError> {
        let text = String::from_utf8_lossy(bytes);
        let lines: Vec<String> =
            text.lines().map(|line| line.trim_end().to_owned()).collect();
        if lines.iter().all(|line| line.trim().is_empty()) {
            return Err(ParseError::Unrecognized(path.to_path_buf()));
        }

        let digest = hex::encode(Sha256::digest(bytes));
        let mut log = ParsedLog::new(path, digest, Vec::new());
        log.generator = lines
            .iter()
            .find(|line| !line.trim().is_empty())
            .map(|line| parse_generator(line.trim()));
        log.main_error = lines
            .iter()
            .map(|line| line.trim())
            .find(|line| line.starts_with("Unhandled exception"))
            .map(str::to_owned);
        log.call_stack = section(&lines, CALL_STACK_HEADER)
            .map(|line| line.trim().to_owned())
            .collect();
        log.plugins = section(&lines, PLUGINS_HEADER)
            .filter_map(|line| parse_plugin(line))
            .collect();
        log.lines = lines;

        trace!(
            target: "scan::pipeline",
            path = %path.display(),
            lines = log.lines.len(),
            call_stack = log.call_stack.len(),
            plugins = log.plugins.len(),
            "crash log parsed"
        );
        Ok(log)
    }
}

fn parse_generator(line: &str) -> CrashGenerator {
    match GENERATOR_RE.captures(line) {
        Some(caps) => CrashGenerator {
            name: caps["name"].to_owned(),
            version: Some(caps["version"].to_owned()),
        },
        None => CrashGenerator {
            name: line.to_owned(),
            version: None,
        },
    }
}

fn parse_plugin(line: &str) -> Option<PluginEntry> {
    let caps = PLUGIN_RE.captures(line)?;
    let slot = caps["slot"].to_ascii_uppercase();
    Some(PluginEntry {
        light: slot.starts_with("FE"),
        load_order: slot,
        name: caps["name"].to_owned(),
    })
}

fn is_section_header(line: &str) -> bool {
    !line.starts_with(char::is_whitespace)
        && line.ends_with(':')
        && !line.starts_with('[')
}

/// Lines following `header` up to the next blank line or section header.
fn section<'a>(
    lines: &'a [String],
    header: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    lines
        .iter()
        .skip_while(move |line| line.trim() != header)
        .skip(1)
        .map(String::as_str)
        .take_while(|line| !line.trim().is_empty() && !is_section_header(line))
}

#[async_trait]
impl LogParser for CrashLogParser {
    async fn parse(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ParsedLog, ParseError> {
        if cancel.is_cancelled() {
            return Err(ParseError::Cancelled);
        }

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ParseError::Cancelled),
            read = tokio::fs::read(path) => {
                read.map_err(|err| ParseError::from_io(path, err))?
            }
        };
        let modified = tokio::fs::metadata(path)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let mut log = self.parse_contents(path, &bytes)?;
        log.crashed_at = modified;
        Ok(log)
    }
}
