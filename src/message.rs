//! # Message structures for pgmq-fluent
//!
//! Defines the outbound message envelope and the inbound delivery handed
//! to listeners. Every send representation (object, map, text, pre-built
//! message) is normalized into a [`QueueMessage`] envelope before it goes
//! onto the wire, so consumers see a uniform JSON shape.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;

/// Payload representation carried by a message envelope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Arbitrary serialized object
    Object,
    /// Key-value map
    Map,
    /// Plain text
    Text,
}

/// Metadata attached to every outbound message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageMetadata {
    /// When the message was built
    pub created_at: DateTime<Utc>,
    /// Correlation ID for tracking across systems
    pub correlation_id: Option<String>,
    /// Which representation the body carries
    pub payload_kind: PayloadKind,
    /// Additional context data
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

impl MessageMetadata {
    fn new(payload_kind: PayloadKind) -> Self {
        Self {
            created_at: Utc::now(),
            correlation_id: Some(Uuid::new_v4().to_string()),
            payload_kind,
            context: HashMap::new(),
        }
    }
}

/// Pre-built outbound message
///
/// # Examples
///
/// ```rust
/// use pgmq_fluent::QueueMessage;
///
/// let message = QueueMessage::text("order shipped")
///     .with_correlation_id("order-1001");
///
/// assert_eq!(message.as_text(), Some("order shipped".to_string()));
/// assert_eq!(message.metadata.correlation_id.as_deref(), Some("order-1001"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueMessage {
    /// JSON body in the representation named by the metadata
    pub body: serde_json::Value,
    /// Message metadata
    pub metadata: MessageMetadata,
}

impl QueueMessage {
    /// Build a message from any serializable object
    pub fn object<T: Serialize>(obj: &T) -> Result<Self> {
        Ok(Self {
            body: serde_json::to_value(obj)?,
            metadata: MessageMetadata::new(PayloadKind::Object),
        })
    }

    /// Build a message from a key-value map
    pub fn map(map: HashMap<String, serde_json::Value>) -> Self {
        Self {
            body: serde_json::Value::Object(map.into_iter().collect()),
            metadata: MessageMetadata::new(PayloadKind::Map),
        }
    }

    /// Build a text message
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            body: serde_json::Value::String(text.into()),
            metadata: MessageMetadata::new(PayloadKind::Text),
        }
    }

    /// Set the correlation ID
    #[must_use]
    pub fn with_correlation_id<S: Into<String>>(mut self, correlation_id: S) -> Self {
        self.metadata.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add a single context entry
    pub fn add_context<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.metadata.context.insert(key.into(), value);
        self
    }

    /// Body as text, when this is a text message
    pub fn as_text(&self) -> Option<String> {
        match self.metadata.payload_kind {
            PayloadKind::Text => self.body.as_str().map(str::to_string),
            _ => None,
        }
    }

    /// Deserialize the body into a concrete type
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    /// Convert to JSON for queue storage
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Create from JSON read off a queue
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(json)?)
    }
}

/// Inbound message handed to listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    /// Queue-assigned message ID
    pub msg_id: i64,
    /// Queue the message was read from
    pub queue_name: String,
    /// How many times the message has been read
    pub read_ct: i32,
    /// When the message was enqueued
    pub enqueued_at: DateTime<Utc>,
    /// Raw JSON as stored on the queue
    pub body: serde_json::Value,
}

impl Delivery {
    /// Parse the stored JSON as a message envelope
    pub fn envelope(&self) -> Result<QueueMessage> {
        QueueMessage::from_json(self.body.clone())
    }

    /// Deserialize the envelope body into a concrete type
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        self.envelope()?.payload()
    }

    /// Envelope body as text, when this is a text message
    pub fn as_text(&self) -> Option<String> {
        self.envelope().ok().and_then(|m| m.as_text())
    }
}
