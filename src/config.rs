//! # Configuration for pgmq-fluent
//!
//! This module provides configuration for builder and session behavior:
//! queue name validation, visibility timeouts, listener polling, and
//! payload size limits.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};

/// Configuration shared by builders and sessions
///
/// # Examples
///
/// ```rust
/// use pgmq_fluent::QueueConfig;
///
/// let config = QueueConfig::new()
///     .with_visibility_timeout_seconds(60)
///     .with_poll_interval_ms(100);
///
/// assert!(config.validate().is_ok());
/// assert!(config.is_valid_queue_name("orders_queue"));
/// assert!(!config.is_valid_queue_name("orders queue"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Pattern a queue name must match to be accepted as a destination.
    /// Default matches what pgmq itself accepts (identifier characters,
    /// at most 47 of them once the pgmq table prefix is accounted for).
    pub queue_name_pattern: String,

    /// Visibility timeout applied when listeners read messages.
    /// An unacknowledged message becomes visible again after this window.
    pub visibility_timeout_seconds: i32,

    /// How long listener dispatch tasks sleep between empty reads
    pub poll_interval_ms: u64,

    /// Optional cap on serialized payload size in bytes
    pub max_payload_size: Option<usize>,

    /// Whether resolving a named destination creates the queue when absent
    pub create_missing_queues: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_name_pattern: r"^[a-zA-Z0-9_]{1,47}$".to_string(),
            visibility_timeout_seconds: 30,
            poll_interval_ms: 250,
            max_payload_size: None,
            create_missing_queues: true,
        }
    }
}

impl QueueConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the queue name validation pattern
    pub fn with_queue_name_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.queue_name_pattern = pattern.into();
        self
    }

    /// Set the visibility timeout for listener reads
    pub fn with_visibility_timeout_seconds(mut self, seconds: i32) -> Self {
        self.visibility_timeout_seconds = seconds;
        self
    }

    /// Set the listener poll interval
    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Set a maximum serialized payload size
    pub fn with_max_payload_size(mut self, size: usize) -> Self {
        self.max_payload_size = Some(size);
        self
    }

    /// Enable or disable queue auto-creation on resolve
    pub fn with_create_missing_queues(mut self, create: bool) -> Self {
        self.create_missing_queues = create;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Test regex compilation
        self.compiled_pattern()?;

        if self.visibility_timeout_seconds <= 0 {
            return Err(QueueError::config(
                "visibility_timeout_seconds must be positive",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(QueueError::config("poll_interval_ms must be positive"));
        }

        if let Some(size) = self.max_payload_size {
            if size == 0 {
                return Err(QueueError::config("max_payload_size must be positive"));
            }
        }

        Ok(())
    }

    /// Compile the queue name pattern regex
    pub fn compiled_pattern(&self) -> Result<Regex> {
        Regex::new(&self.queue_name_pattern).map_err(QueueError::Regex)
    }

    /// Check whether a queue name is acceptable as a destination
    pub fn is_valid_queue_name(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        match self.compiled_pattern() {
            Ok(regex) => regex.is_match(name),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.visibility_timeout_seconds, 30);
        assert_eq!(config.poll_interval_ms, 250);
        assert!(config.create_missing_queues);
        assert!(config.max_payload_size.is_none());
    }

    #[test]
    fn test_queue_name_validation() {
        let config = QueueConfig::default();

        assert!(config.is_valid_queue_name("orders_queue"));
        assert!(config.is_valid_queue_name("Q1"));
        assert!(!config.is_valid_queue_name(""));
        assert!(!config.is_valid_queue_name("orders-queue"));
        assert!(!config.is_valid_queue_name("a".repeat(48).as_str()));
    }

    #[test]
    fn test_validation() {
        // Invalid regex
        let config = QueueConfig::new().with_queue_name_pattern("[invalid");
        assert!(config.validate().is_err());

        // Non-positive visibility timeout
        let config = QueueConfig::new().with_visibility_timeout_seconds(0);
        assert!(config.validate().is_err());

        // Zero poll interval
        let config = QueueConfig::new().with_poll_interval_ms(0);
        assert!(config.validate().is_err());

        // Valid custom config
        let config = QueueConfig::new()
            .with_visibility_timeout_seconds(120)
            .with_max_payload_size(64 * 1024);
        assert!(config.validate().is_ok());
    }
}
