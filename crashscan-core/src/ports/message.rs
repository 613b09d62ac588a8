use std::fmt;

use crashscan_model::MessageLevel;
use tracing::{debug, error, info, warn};

/// Fire-and-forget channel for user-facing messages.
pub trait MessageSink: Send + Sync + fmt::Debug {
    fn show(&self, level: MessageLevel, text: &str);

    fn debug(&self, text: &str) {
        self.show(MessageLevel::Debug, text);
    }

    fn info(&self, text: &str) {
        self.show(MessageLevel::Info, text);
    }

    fn success(&self, text: &str) {
        self.show(MessageLevel::Success, text);
    }

    fn warning(&self, text: &str) {
        self.show(MessageLevel::Warning, text);
    }

    fn error(&self, text: &str) {
        self.show(MessageLevel::Error, text);
    }

    fn critical(&self, text: &str) {
        self.show(MessageLevel::Critical, text);
    }
}

/// Forwards messages to `tracing` under the `scan::messages` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMessageSink;

impl MessageSink for TracingMessageSink {
    fn show(&self, level: MessageLevel, text: &str) {
        match level {
            MessageLevel::Debug => debug!(target: "scan::messages", "{text}"),
            MessageLevel::Info | MessageLevel::Success => {
                info!(target: "scan::messages", %level, "{text}")
            }
            MessageLevel::Warning => warn!(target: "scan::messages", "{text}"),
            MessageLevel::Error | MessageLevel::Critical => {
                error!(target: "scan::messages", %level, "{text}")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessageSink;

impl MessageSink for NullMessageSink {
    fn show(&self, _level: MessageLevel, _text: &str) {}
}
