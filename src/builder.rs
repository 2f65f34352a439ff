//! # Fluent queue builder
//!
//! [`QueueBuilder`] accumulates destinations and dispatches one message per
//! call across all of them, in whichever representation the caller picked.
//! It is a convenience facade: resolution, delivery, and listener lifecycle
//! all delegate to the bound [`QueueSession`].

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::QueueConfig;
use crate::destination::{Destination, QueueHandle};
use crate::error::{QueueError, Result};
use crate::listener::{MessageListener, SubscriptionHandle};
use crate::message::QueueMessage;
use crate::session::QueueSession;

/// Fluent send/listen facade over a queue session
///
/// Builders are cheap to create and not meant to be shared across tasks;
/// spawn one per unit of work with [`QueueBuilder::new_builder`].
///
/// # Examples
///
/// ```rust,ignore
/// use pgmq_fluent::{PgmqSession, QueueBuilder, QueueConfig};
/// use std::sync::Arc;
///
/// let session = Arc::new(PgmqSession::new(&database_url, QueueConfig::default()).await?);
///
/// QueueBuilder::new(session)
///     .destination("orders_queue")?
///     .destination("audit_queue")?
///     .send_text("order 1001 placed")
///     .await?
///     .send_map(payload_map)
///     .await?;
/// ```
pub struct QueueBuilder {
    session: Arc<dyn QueueSession>,
    config: QueueConfig,
    destinations: Vec<Destination>,
    delay_seconds: u64,
    subscriptions: Vec<SubscriptionHandle>,
}

impl QueueBuilder {
    /// Create a builder bound to a session
    pub fn new(session: Arc<dyn QueueSession>) -> Self {
        let config = session.config().clone();
        Self {
            session,
            config,
            destinations: Vec::new(),
            delay_seconds: 0,
            subscriptions: Vec::new(),
        }
    }

    /// Add a destination by lookup name
    ///
    /// The name is validated against the configured pattern here; actual
    /// resolution happens per send/listen call and may still fail when the
    /// queue is absent and auto-creation is disabled.
    pub fn destination<S: Into<String>>(mut self, name: S) -> Result<Self> {
        let name = name.into();
        if !self.config.is_valid_queue_name(&name) {
            return Err(QueueError::invalid_queue_name(name));
        }
        self.destinations.push(Destination::Named(name));
        Ok(self)
    }

    /// Add an already-resolved queue handle as a destination
    pub fn queue(mut self, handle: QueueHandle) -> Self {
        self.destinations.push(Destination::Handle(handle));
        self
    }

    /// Delay visibility of every subsequent send by this many seconds
    pub fn delay(mut self, seconds: u64) -> Self {
        self.delay_seconds = seconds;
        self
    }

    /// Destinations accumulated so far
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Serialize and send an object to every accumulated destination
    pub async fn send_object<T: Serialize>(&self, obj: &T) -> Result<&Self> {
        let message = QueueMessage::object(obj)?;
        self.dispatch(message).await
    }

    /// Send a pre-built message to every accumulated destination
    pub async fn send(&self, message: QueueMessage) -> Result<&Self> {
        self.dispatch(message).await
    }

    /// Send a key-value map to every accumulated destination
    pub async fn send_map(&self, map: HashMap<String, serde_json::Value>) -> Result<&Self> {
        self.dispatch(QueueMessage::map(map)).await
    }

    /// Send plain text to every accumulated destination
    pub async fn send_text<S: Into<String>>(&self, text: S) -> Result<&Self> {
        self.dispatch(QueueMessage::text(text)).await
    }

    /// Register listeners on every accumulated destination
    ///
    /// Each listener gets its own dispatch task per destination; handles
    /// are retained on the builder until [`QueueBuilder::stop_listening`]
    /// or drop.
    #[instrument(skip(self, listeners))]
    pub async fn listen<I>(&mut self, listeners: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = Arc<dyn MessageListener>>,
    {
        if self.destinations.is_empty() {
            return Err(QueueError::NoDestinations);
        }

        let listeners: Vec<Arc<dyn MessageListener>> = listeners.into_iter().collect();

        for destination in self.destinations.clone() {
            let handle = self.resolve(&destination).await?;
            for listener in &listeners {
                let subscription = self
                    .session
                    .subscribe(&handle, Arc::clone(listener))
                    .await?;
                self.subscriptions.push(subscription);
            }
        }

        Ok(self)
    }

    /// Subscriptions created by [`QueueBuilder::listen`]
    pub fn subscriptions(&self) -> &[SubscriptionHandle] {
        &self.subscriptions
    }

    /// Stop all dispatch tasks started by this builder
    ///
    /// Tasks that already finished on their own are dropped without error.
    pub fn stop_listening(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            if subscription.stop().is_err() {
                debug!(
                    "Dispatch task for queue {} already stopped",
                    subscription.queue_name()
                );
            }
        }
    }

    /// Create a fresh builder on the same session
    ///
    /// The new builder starts empty: destinations, delay, and listeners do
    /// not carry over.
    pub fn new_builder(&self) -> Self {
        Self::new(Arc::clone(&self.session))
    }

    async fn resolve(&self, destination: &Destination) -> Result<QueueHandle> {
        match destination {
            Destination::Named(name) => self.session.resolve(name).await,
            Destination::Handle(handle) => Ok(handle.clone()),
        }
    }

    async fn dispatch(&self, message: QueueMessage) -> Result<&Self> {
        if self.destinations.is_empty() {
            return Err(QueueError::NoDestinations);
        }

        let body = message.to_json()?;

        if let Some(limit) = self.config.max_payload_size {
            let size = body.to_string().len();
            if size > limit {
                return Err(QueueError::PayloadTooLarge { size, limit });
            }
        }

        for destination in &self.destinations {
            let handle = self.resolve(destination).await?;
            let msg_id = self
                .session
                .send(&handle, &body, self.delay_seconds)
                .await?;
            debug!(
                "Dispatched message {} to queue {} ({:?})",
                msg_id,
                handle.name(),
                message.metadata.payload_kind
            );
        }

        Ok(self)
    }
}

impl std::fmt::Debug for QueueBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueBuilder")
            .field("destinations", &self.destinations)
            .field("delay_seconds", &self.delay_seconds)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
