//! Error types for pgmq-fluent

use thiserror::Error;

/// Result type for pgmq-fluent operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors that can occur in pgmq-fluent operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Queue name is empty or does not match the configured pattern
    #[error("Invalid queue name: {name}")]
    InvalidQueueName { name: String },

    /// Named destination could not be resolved to an existing queue
    #[error("Unresolved destination: {name}")]
    UnresolvedDestination { name: String },

    /// Send or listen attempted with no accumulated destinations
    #[error("Builder has no destinations")]
    NoDestinations,

    /// Outbound payload exceeds the configured size limit
    #[error("Payload size {size} exceeds limit {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Subscription dispatch task is no longer running
    #[error("Listener is not running")]
    ListenerStopped,

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Generic error for compatibility
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl QueueError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid queue name error
    pub fn invalid_queue_name<S: Into<String>>(name: S) -> Self {
        Self::InvalidQueueName { name: name.into() }
    }

    /// Create an unresolved destination error
    pub fn unresolved<S: Into<String>>(name: S) -> Self {
        Self::UnresolvedDestination { name: name.into() }
    }
}
