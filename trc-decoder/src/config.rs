//! Reader configuration types
//!
//! The reader takes no hidden defaults on what to do with a broken line:
//! the policy is part of the configuration and travels with every read.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the reader does with a line the dialect cannot parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log a warning and continue with the next line
    Skip,
    /// Yield the error and end the sequence
    #[default]
    Abort,
}

/// Configuration for batch and follow reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Policy for malformed data lines
    #[serde(default)]
    pub on_error: ErrorPolicy,

    /// Only yield records classified as payload traffic
    #[serde(default)]
    pub messages_only: bool,

    /// Follow mode: sleep between end-of-file checks (default: 250ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Follow mode: skip everything already written when following starts
    #[serde(default)]
    pub start_at_end: bool,
}

fn default_poll_interval() -> u64 {
    250
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            on_error: ErrorPolicy::default(),
            messages_only: false,
            poll_interval_ms: default_poll_interval(),
            start_at_end: false,
        }
    }
}

impl ReaderConfig {
    /// Create a new reader configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the malformed line policy
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    /// Builder method: drop error, event and remote request records
    pub fn with_messages_only(mut self, enabled: bool) -> Self {
        self.messages_only = enabled;
        self
    }

    /// Builder method: set the follow mode poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Builder method: start following at the current end of file
    pub fn with_start_at_end(mut self, enabled: bool) -> Self {
        self.start_at_end = enabled;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_config_builder() {
        let config = ReaderConfig::new()
            .with_error_policy(ErrorPolicy::Skip)
            .with_messages_only(true)
            .with_poll_interval(Duration::from_millis(20))
            .with_start_at_end(true);

        assert_eq!(config.on_error, ErrorPolicy::Skip);
        assert!(config.messages_only);
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert!(config.start_at_end);
    }

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::new();

        assert_eq!(config.on_error, ErrorPolicy::Abort);
        assert!(!config.messages_only);
        assert_eq!(config.poll_interval_ms, 250);
        assert!(!config.start_at_end);
    }
}
