//! PGMQ-backed session using `sqlx` and the pgmq SQL API
//!
//! All queries are runtime-bound so the crate builds without a live
//! database. Listener dispatch polls `pgmq.read` with the configured
//! visibility timeout; acknowledged deliveries are deleted, failed ones
//! reappear once the timeout lapses.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::config::QueueConfig;
use crate::destination::QueueHandle;
use crate::error::{QueueError, Result};
use crate::listener::{
    record_dispatch, record_read_error, ListenerStats, MessageListener, SubscriptionHandle,
};
use crate::message::Delivery;
use crate::session::{QueueMetrics, QueueSession};

/// Session backed by a PostgreSQL database with the pgmq extension
#[derive(Debug, Clone)]
pub struct PgmqSession {
    pool: PgPool,
    config: QueueConfig,
}

impl PgmqSession {
    /// Connect to the database and create a session
    pub async fn new(database_url: &str, config: QueueConfig) -> Result<Self> {
        config.validate()?;

        info!("Connecting pgmq-fluent session");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        info!("Connected pgmq-fluent session");

        Ok(Self { pool, config })
    }

    /// Create a session over an existing connection pool
    pub fn new_with_pool(pool: PgPool, config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { pool, config })
    }

    /// Get reference to the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create queue if it doesn't exist
    #[instrument(skip(self), fields(queue = %queue_name))]
    pub async fn create_queue(&self, queue_name: &str) -> Result<()> {
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue_name)
            .execute(&self.pool)
            .await?;

        info!("Queue created: {}", queue_name);
        Ok(())
    }

    /// Drop queue completely
    #[instrument(skip(self), fields(queue = %queue_name))]
    pub async fn drop_queue(&self, queue_name: &str) -> Result<()> {
        warn!("Dropping queue: {}", queue_name);

        sqlx::query("SELECT pgmq.drop_queue($1)")
            .bind(queue_name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get queue metrics/statistics
    #[instrument(skip(self), fields(queue = %queue_name))]
    pub async fn queue_metrics(&self, queue_name: &str) -> Result<QueueMetrics> {
        let row = sqlx::query(
            "SELECT queue_length, oldest_msg_age_sec FROM pgmq.metrics($1)",
        )
        .bind(queue_name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let queue_length: Option<i64> = row.try_get("queue_length")?;
            let oldest_age: Option<i32> = row.try_get("oldest_msg_age_sec")?;
            Ok(QueueMetrics {
                queue_name: queue_name.to_string(),
                message_count: queue_length.unwrap_or(0),
                oldest_message_age_seconds: oldest_age.map(i64::from),
            })
        } else {
            Ok(QueueMetrics {
                queue_name: queue_name.to_string(),
                ..QueueMetrics::default()
            })
        }
    }

    async fn queue_exists(&self, queue_name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pgmq.list_queues() WHERE queue_name = $1)",
        )
        .bind(queue_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

/// Read the next visible message, claiming it for `visibility_timeout` seconds
async fn read_one(pool: &PgPool, queue_name: &str, visibility_timeout: i32) -> Result<Option<Delivery>> {
    let row = sqlx::query(
        "SELECT msg_id, read_ct, enqueued_at, message FROM pgmq.read($1, $2, $3)",
    )
    .bind(queue_name)
    .bind(visibility_timeout)
    .bind(1i32)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(Delivery {
        msg_id: row.try_get("msg_id")?,
        queue_name: queue_name.to_string(),
        read_ct: row.try_get("read_ct")?,
        enqueued_at: row.try_get("enqueued_at")?,
        body: row.try_get("message")?,
    }))
}

/// Acknowledge a delivery by deleting it from the queue
async fn delete_message(pool: &PgPool, queue_name: &str, msg_id: i64) -> Result<()> {
    sqlx::query("SELECT pgmq.delete($1, $2::bigint)")
        .bind(queue_name)
        .bind(msg_id)
        .execute(pool)
        .await?;

    debug!("Message deleted: {}", msg_id);
    Ok(())
}

#[async_trait]
impl QueueSession for PgmqSession {
    #[instrument(skip(self), fields(queue = %name))]
    async fn resolve(&self, name: &str) -> Result<QueueHandle> {
        if !self.config.is_valid_queue_name(name) {
            return Err(QueueError::invalid_queue_name(name));
        }

        if !self.queue_exists(name).await? {
            if !self.config.create_missing_queues {
                return Err(QueueError::unresolved(name));
            }
            self.create_queue(name).await?;
        }

        Ok(QueueHandle::new(name))
    }

    #[instrument(skip(self, body), fields(queue = %queue.name(), delay_seconds = %delay_seconds))]
    async fn send(
        &self,
        queue: &QueueHandle,
        body: &serde_json::Value,
        delay_seconds: u64,
    ) -> Result<i64> {
        let msg_id = sqlx::query_scalar::<_, i64>("SELECT pgmq.send($1, $2, $3)")
            .bind(queue.name())
            .bind(body)
            .bind(delay_seconds as i32)
            .fetch_one(&self.pool)
            .await?;

        debug!("Message sent to queue {} with ID {}", queue.name(), msg_id);
        Ok(msg_id)
    }

    #[instrument(skip(self, listener), fields(queue = %queue.name()))]
    async fn subscribe(
        &self,
        queue: &QueueHandle,
        listener: Arc<dyn MessageListener>,
    ) -> Result<SubscriptionHandle> {
        let pool = self.pool.clone();
        let queue_name = queue.name().to_string();
        let visibility_timeout = self.config.visibility_timeout_seconds;
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let stats = Arc::new(RwLock::new(ListenerStats::default()));
        let task_stats = Arc::clone(&stats);
        let task_queue = queue_name.clone();

        info!("Starting dispatch task for queue: {}", queue_name);

        let task = tokio::spawn(async move {
            loop {
                match read_one(&pool, &task_queue, visibility_timeout).await {
                    Ok(Some(delivery)) => {
                        let msg_id = delivery.msg_id;
                        match listener.on_message(delivery).await {
                            Ok(()) => {
                                record_dispatch(&task_stats, true);
                                if let Err(e) = delete_message(&pool, &task_queue, msg_id).await {
                                    error!(
                                        "Failed to acknowledge message {} on {}: {}",
                                        msg_id, task_queue, e
                                    );
                                    listener.on_error(&task_queue, e).await;
                                }
                            }
                            Err(e) => {
                                // Message stays claimed until the visibility
                                // timeout lapses, then gets redelivered.
                                record_dispatch(&task_stats, false);
                                listener.on_error(&task_queue, e).await;
                            }
                        }
                    }
                    Ok(None) => {
                        tokio::time::sleep(poll_interval).await;
                    }
                    Err(e) => {
                        record_read_error(&task_stats);
                        listener.on_error(&task_queue, e).await;
                        tokio::time::sleep(poll_interval).await;
                    }
                }
            }
        });

        Ok(SubscriptionHandle::new(queue_name, stats, task))
    }

    async fn healthy(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                error!("Session health check failed: {}", e);
                false
            }
        }
    }

    fn config(&self) -> &QueueConfig {
        &self.config
    }
}
