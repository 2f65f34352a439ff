//! In-process session for tests and embedded use
//!
//! Mirrors pgmq semantics closely enough for facade-level testing:
//! per-queue FIFO order, send delays, visibility timeouts on read, and
//! delete-on-acknowledge.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::destination::QueueHandle;
use crate::error::{QueueError, Result};
use crate::listener::{
    record_dispatch, ListenerStats, MessageListener, SubscriptionHandle,
};
use crate::message::Delivery;
use crate::session::QueueSession;

#[derive(Debug, Clone)]
struct StoredMessage {
    msg_id: i64,
    read_ct: i32,
    enqueued_at: DateTime<Utc>,
    visible_at: DateTime<Utc>,
    body: serde_json::Value,
}

type QueueMap = HashMap<String, VecDeque<StoredMessage>>;

/// Session backed by in-process queues
#[derive(Debug, Clone)]
pub struct MemorySession {
    queues: Arc<Mutex<QueueMap>>,
    next_id: Arc<AtomicI64>,
    config: QueueConfig,
}

impl MemorySession {
    /// Create an in-process session
    pub fn new(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            queues: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            config,
        })
    }

    /// Number of messages currently stored on a queue, visible or not
    pub fn message_count(&self, queue_name: &str) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(queue_name)
            .map_or(0, VecDeque::len)
    }

    /// Names of all queues this session has created
    pub fn queue_names(&self) -> Vec<String> {
        self.queues.lock().unwrap().keys().cloned().collect()
    }

    /// Claim the next visible message, hiding it for the visibility timeout
    fn read_one(queues: &Mutex<QueueMap>, queue_name: &str, visibility_timeout: i32) -> Option<Delivery> {
        let mut queues = queues.lock().unwrap();
        let queue = queues.get_mut(queue_name)?;
        let now = Utc::now();

        let stored = queue.iter_mut().find(|m| m.visible_at <= now)?;
        stored.read_ct += 1;
        stored.visible_at = now + ChronoDuration::seconds(i64::from(visibility_timeout));

        Some(Delivery {
            msg_id: stored.msg_id,
            queue_name: queue_name.to_string(),
            read_ct: stored.read_ct,
            enqueued_at: stored.enqueued_at,
            body: stored.body.clone(),
        })
    }

    /// Acknowledge a delivery by removing it from the queue
    fn delete_message(queues: &Mutex<QueueMap>, queue_name: &str, msg_id: i64) {
        let mut queues = queues.lock().unwrap();
        if let Some(queue) = queues.get_mut(queue_name) {
            queue.retain(|m| m.msg_id != msg_id);
        }
    }
}

#[async_trait]
impl QueueSession for MemorySession {
    async fn resolve(&self, name: &str) -> Result<QueueHandle> {
        if !self.config.is_valid_queue_name(name) {
            return Err(QueueError::invalid_queue_name(name));
        }

        let mut queues = self.queues.lock().unwrap();
        if !queues.contains_key(name) {
            if !self.config.create_missing_queues {
                return Err(QueueError::unresolved(name));
            }
            queues.insert(name.to_string(), VecDeque::new());
            debug!("Queue created: {}", name);
        }

        Ok(QueueHandle::new(name))
    }

    async fn send(
        &self,
        queue: &QueueHandle,
        body: &serde_json::Value,
        delay_seconds: u64,
    ) -> Result<i64> {
        let msg_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();

        let mut queues = self.queues.lock().unwrap();
        let Some(messages) = queues.get_mut(queue.name()) else {
            return Err(QueueError::unresolved(queue.name()));
        };

        messages.push_back(StoredMessage {
            msg_id,
            read_ct: 0,
            enqueued_at: now,
            visible_at: now + ChronoDuration::seconds(delay_seconds as i64),
            body: body.clone(),
        });

        debug!("Message sent to queue {} with ID {}", queue.name(), msg_id);
        Ok(msg_id)
    }

    async fn subscribe(
        &self,
        queue: &QueueHandle,
        listener: Arc<dyn MessageListener>,
    ) -> Result<SubscriptionHandle> {
        let queues = Arc::clone(&self.queues);
        let queue_name = queue.name().to_string();
        let visibility_timeout = self.config.visibility_timeout_seconds;
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let stats = Arc::new(RwLock::new(ListenerStats::default()));
        let task_stats = Arc::clone(&stats);
        let task_queue = queue_name.clone();

        info!("Starting in-process dispatch task for queue: {}", queue_name);

        let task = tokio::spawn(async move {
            loop {
                match Self::read_one(&queues, &task_queue, visibility_timeout) {
                    Some(delivery) => {
                        let msg_id = delivery.msg_id;
                        match listener.on_message(delivery).await {
                            Ok(()) => {
                                record_dispatch(&task_stats, true);
                                Self::delete_message(&queues, &task_queue, msg_id);
                            }
                            Err(e) => {
                                record_dispatch(&task_stats, false);
                                listener.on_error(&task_queue, e).await;
                            }
                        }
                    }
                    None => {
                        tokio::time::sleep(poll_interval).await;
                    }
                }
            }
        });

        Ok(SubscriptionHandle::new(queue_name, stats, task))
    }

    async fn healthy(&self) -> bool {
        true
    }

    fn config(&self) -> &QueueConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_creates_queue() {
        let session = MemorySession::new(QueueConfig::default()).unwrap();

        let handle = session.resolve("orders_queue").await.unwrap();
        assert_eq!(handle.name(), "orders_queue");
        assert_eq!(session.queue_names(), vec!["orders_queue".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_missing_queue_without_auto_create() {
        let config = QueueConfig::new().with_create_missing_queues(false);
        let session = MemorySession::new(config).unwrap();

        let result = session.resolve("orders_queue").await;
        assert!(matches!(result, Err(QueueError::UnresolvedDestination { .. })));
    }

    #[tokio::test]
    async fn test_resolve_rejects_invalid_name() {
        let session = MemorySession::new(QueueConfig::default()).unwrap();

        assert!(matches!(
            session.resolve("").await,
            Err(QueueError::InvalidQueueName { .. })
        ));
        assert!(matches!(
            session.resolve("bad name").await,
            Err(QueueError::InvalidQueueName { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_and_claim() {
        let session = MemorySession::new(QueueConfig::default()).unwrap();
        let handle = session.resolve("orders_queue").await.unwrap();

        let msg_id = session.send(&handle, &json!({"order_id": 1}), 0).await.unwrap();
        assert_eq!(session.message_count("orders_queue"), 1);

        let delivery =
            MemorySession::read_one(&session.queues, "orders_queue", 30).expect("visible message");
        assert_eq!(delivery.msg_id, msg_id);
        assert_eq!(delivery.read_ct, 1);

        // Claimed message is invisible until the timeout lapses
        assert!(MemorySession::read_one(&session.queues, "orders_queue", 30).is_none());

        MemorySession::delete_message(&session.queues, "orders_queue", msg_id);
        assert_eq!(session.message_count("orders_queue"), 0);
    }

    #[tokio::test]
    async fn test_stop_on_finished_subscription_fails() {
        use crate::listener::MessageListener;
        use async_trait::async_trait;
        use std::time::Duration;

        struct DropListener;

        #[async_trait]
        impl MessageListener for DropListener {
            async fn on_message(&self, _delivery: Delivery) -> Result<()> {
                Ok(())
            }
        }

        let config = QueueConfig::new().with_poll_interval_ms(10);
        let session = MemorySession::new(config).unwrap();
        let handle = session.resolve("orders_queue").await.unwrap();

        let subscription = session
            .subscribe(&handle, Arc::new(DropListener))
            .await
            .unwrap();
        assert!(subscription.is_running());

        // First stop succeeds, then wait for the abort to land
        subscription.stop().unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while subscription.is_running() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!subscription.is_running());

        // Stopping a finished task reports it
        assert!(matches!(
            subscription.stop(),
            Err(QueueError::ListenerStopped)
        ));
    }

    #[tokio::test]
    async fn test_delayed_send_not_immediately_visible() {
        let session = MemorySession::new(QueueConfig::default()).unwrap();
        let handle = session.resolve("orders_queue").await.unwrap();

        session.send(&handle, &json!("later"), 60).await.unwrap();

        assert!(MemorySession::read_one(&session.queues, "orders_queue", 30).is_none());
        assert_eq!(session.message_count("orders_queue"), 1);
    }
}
