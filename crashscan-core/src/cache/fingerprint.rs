use std::fmt;

use crashscan_model::ParsedLog;
use sha2::{Digest, Sha256};

use crate::ports::Analyzer;

/// Cache key derived from file content and analyzer identity.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Combines a content digest with an identity string naming whatever
    /// produced the cached value (an analyzer, or a whole analyzer set).
    pub fn new(content_digest: &str, identity: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content_digest.as_bytes());
        hasher.update([0u8]);
        hasher.update(identity.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn for_analyzer(log: &ParsedLog, analyzer: &dyn Analyzer) -> Self {
        let identity = format!("{}#{}", analyzer.name(), analyzer.revision());
        Self::new(&log.content_digest, &identity)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is plenty for log lines.
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}
