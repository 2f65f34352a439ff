//! # pgmq-fluent
//!
//! Fluent send/listen builder for applications running on PGMQ-backed
//! message queues.
//!
//! The crate is a convenience facade: a [`QueueBuilder`] accumulates
//! destinations (by name or by resolved handle), sends one message per
//! call in any of four representations, and registers listeners against
//! the accumulated destinations. Everything hard lives in the session the
//! builder is bound to: [`PgmqSession`] for PostgreSQL with the pgmq
//! extension, [`MemorySession`] for tests and embedded use.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pgmq_fluent::{MemorySession, PgmqSession, QueueBuilder, QueueConfig, QueueMessage};
//! use std::sync::Arc;
//!
//! let config = QueueConfig::new().with_visibility_timeout_seconds(60);
//! let session = Arc::new(PgmqSession::new(&database_url, config).await?);
//!
//! // Send the same payload to two queues, then a follow-up
//! QueueBuilder::new(session.clone())
//!     .destination("orders_queue")?
//!     .destination("audit_queue")?
//!     .send_object(&order_placed)
//!     .await?
//!     .send_text("order 1001 accepted")
//!     .await?;
//!
//! // Attach a listener to a queue
//! let mut consumer = QueueBuilder::new(session).destination("orders_queue")?;
//! consumer.listen([handler]).await?;
//! ```
//!
//! Delivery guarantees, queue lifecycle, and connection pooling are the
//! provider's concern; the builder adds no semantics of its own beyond
//! fan-out across its accumulated destinations.

pub mod builder;
pub mod config;
pub mod destination;
pub mod error;
pub mod listener;
pub mod message;
pub mod session;

pub use builder::QueueBuilder;
pub use config::QueueConfig;
pub use destination::{Destination, QueueHandle};
pub use error::{QueueError, Result};
pub use listener::{ListenerStats, MessageListener, SubscriptionHandle};
pub use message::{Delivery, MessageMetadata, PayloadKind, QueueMessage};
pub use session::{MemorySession, PgmqSession, QueueMetrics, QueueSession};
