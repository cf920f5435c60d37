//! Protocol engine configuration

use std::time::Duration;

/// Log target used by [`LogTrace`](crate::LogTrace) unless overridden.
pub const DEFAULT_TRACE_TARGET: &str = "uhf_interrogator::protocol";

/// Tunables for [`ProtocolHandler`](crate::ProtocolHandler)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Base response timeout. Tag operations scale it (x2 lock/kill/custom,
    /// x4 read/write, x10 for a deferred result).
    pub response_timeout: Duration,
    /// Read timeout used by the receive pump on each poll.
    pub receive_poll: Duration,
    /// Log target for the default trace sink.
    pub trace_target: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(1000),
            receive_poll: Duration::from_millis(10),
            trace_target: DEFAULT_TRACE_TARGET.to_string(),
        }
    }
}

impl ProtocolConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_receive_poll(mut self, poll: Duration) -> Self {
        self.receive_poll = poll;
        self
    }

    pub(crate) fn scaled_timeout(&self, factor: u32) -> Duration {
        self.response_timeout.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProtocolConfig::default();
        assert_eq!(config.response_timeout, Duration::from_millis(1000));
        assert_eq!(config.receive_poll, Duration::from_millis(10));
        assert_eq!(config.trace_target, DEFAULT_TRACE_TARGET);
    }

    #[test]
    fn test_scaled_timeout() {
        let config = ProtocolConfig::default().with_response_timeout(Duration::from_millis(50));
        assert_eq!(config.scaled_timeout(4), Duration::from_millis(200));
        assert_eq!(config.scaled_timeout(10), Duration::from_millis(500));
    }
}
