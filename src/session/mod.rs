//! # Session seam between the builder and the messaging provider
//!
//! A [`QueueSession`] owns destination resolution, delivery, and listener
//! dispatch. The builder is a thin facade over whichever session it is
//! bound to: [`PgmqSession`] in production, [`MemorySession`] for tests
//! and embedded use.

pub mod memory;
pub mod pgmq;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::QueueConfig;
use crate::destination::QueueHandle;
use crate::error::Result;
use crate::listener::{MessageListener, SubscriptionHandle};

pub use memory::MemorySession;
pub use pgmq::PgmqSession;

/// Queue metrics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QueueMetrics {
    /// Name of the queue
    pub queue_name: String,
    /// Current message count in queue
    pub message_count: i64,
    /// Age of oldest message in seconds (if any)
    pub oldest_message_age_seconds: Option<i64>,
}

/// Ambient messaging context the builder delegates to
///
/// Implementations own connection management, queue lifecycle, and
/// delivery semantics; the builder adds no guarantees on top.
#[async_trait]
pub trait QueueSession: Send + Sync {
    /// Resolve a symbolic name to a queue handle.
    ///
    /// When `create_missing_queues` is set, an absent queue is created;
    /// otherwise resolution fails with `UnresolvedDestination`.
    async fn resolve(&self, name: &str) -> Result<QueueHandle>;

    /// Send a JSON body to a resolved queue, returning the message ID.
    /// `delay_seconds` hides the message from readers for that long.
    async fn send(
        &self,
        queue: &QueueHandle,
        body: &serde_json::Value,
        delay_seconds: u64,
    ) -> Result<i64>;

    /// Spawn a dispatch task feeding the listener from the queue
    async fn subscribe(
        &self,
        queue: &QueueHandle,
        listener: Arc<dyn MessageListener>,
    ) -> Result<SubscriptionHandle>;

    /// Whether the session can currently reach its backing provider
    async fn healthy(&self) -> bool;

    /// Configuration this session was built with
    fn config(&self) -> &QueueConfig;
}
