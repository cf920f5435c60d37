//! Trace sinks for the protocol engine.
//!
//! The engine never logs through global state of its own; it is handed a
//! sink at construction time. [`LogTrace`] forwards to the `log` facade.

use log::Level;
use std::fmt;

/// Receiver of protocol trace messages
pub trait TraceSink: Send + Sync {
    fn record(&self, level: Level, message: fmt::Arguments<'_>);
}

/// Forwards trace messages to the `log` crate under a fixed target
#[derive(Debug, Clone)]
pub struct LogTrace {
    target: String,
}

impl LogTrace {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogTrace {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TRACE_TARGET)
    }
}

impl TraceSink for LogTrace {
    fn record(&self, level: Level, message: fmt::Arguments<'_>) {
        log::log!(target: self.target.as_str(), level, "{}", message);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn record(&self, _level: Level, _message: fmt::Arguments<'_>) {}
}
