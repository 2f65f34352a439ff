//! Listener trait and subscription handles for message dispatch

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{QueueError, Result};
use crate::message::Delivery;

/// Statistics about a running subscription
#[derive(Debug, Clone, Default)]
pub struct ListenerStats {
    pub messages_dispatched: u64,
    pub handler_errors: u64,
    pub read_errors: u64,
    pub last_message_at: Option<SystemTime>,
    pub last_error_at: Option<SystemTime>,
}

/// Callback invoked when a message arrives on a subscribed destination
///
/// Returning `Ok` acknowledges the delivery (the message is deleted from
/// the queue). Returning `Err` leaves it to become visible again after the
/// configured visibility timeout.
#[async_trait]
pub trait MessageListener: Send + Sync {
    /// Handle a delivered message
    async fn on_message(&self, delivery: Delivery) -> Result<()>;

    /// Handle a read or dispatch error
    async fn on_error(&self, queue_name: &str, error: QueueError) {
        warn!("Listener error on queue {}: {}", queue_name, error);
    }
}

/// Handle to a spawned dispatch task for one listener on one queue
///
/// Dropping the handle does not stop the task; call [`SubscriptionHandle::stop`].
#[derive(Debug)]
pub struct SubscriptionHandle {
    queue_name: String,
    stats: Arc<RwLock<ListenerStats>>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        queue_name: String,
        stats: Arc<RwLock<ListenerStats>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            queue_name,
            stats,
            task,
        }
    }

    /// Queue this subscription dispatches from
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Snapshot of dispatch statistics
    pub fn stats(&self) -> ListenerStats {
        self.stats.read().unwrap().clone()
    }

    /// Whether the dispatch task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the dispatch task
    ///
    /// Fails with [`QueueError::ListenerStopped`] when the task has
    /// already finished.
    pub fn stop(&self) -> Result<()> {
        if self.task.is_finished() {
            return Err(QueueError::ListenerStopped);
        }
        self.task.abort();
        Ok(())
    }
}

/// Shared stats bookkeeping for dispatch loops
pub(crate) fn record_dispatch(stats: &Arc<RwLock<ListenerStats>>, handler_ok: bool) {
    let mut stats = stats.write().unwrap();
    stats.messages_dispatched += 1;
    stats.last_message_at = Some(SystemTime::now());
    if !handler_ok {
        stats.handler_errors += 1;
        stats.last_error_at = Some(SystemTime::now());
    }
}

pub(crate) fn record_read_error(stats: &Arc<RwLock<ListenerStats>>) {
    let mut stats = stats.write().unwrap();
    stats.read_errors += 1;
    stats.last_error_at = Some(SystemTime::now());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_stats_default() {
        let stats = ListenerStats::default();
        assert_eq!(stats.messages_dispatched, 0);
        assert_eq!(stats.handler_errors, 0);
        assert!(stats.last_message_at.is_none());
    }

    #[test]
    fn test_record_dispatch() {
        let stats = Arc::new(RwLock::new(ListenerStats::default()));

        record_dispatch(&stats, true);
        record_dispatch(&stats, false);

        let snapshot = stats.read().unwrap().clone();
        assert_eq!(snapshot.messages_dispatched, 2);
        assert_eq!(snapshot.handler_errors, 1);
        assert!(snapshot.last_message_at.is_some());
        assert!(snapshot.last_error_at.is_some());
    }
}
