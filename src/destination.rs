//! Destinations a builder can accumulate: symbolic names resolved by the
//! session, or already-resolved queue handles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An already-resolved queue reference
///
/// Handles are produced by session resolution and can be accumulated on a
/// builder directly to skip per-send lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueHandle {
    name: String,
    resolved_at: DateTime<Utc>,
}

impl QueueHandle {
    /// Create a handle for a queue known to exist
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            resolved_at: Utc::now(),
        }
    }

    /// Queue name this handle points at
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When the handle was resolved
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}

/// An addressable target for message delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Destination {
    /// Symbolic lookup name, resolved by the session at send/listen time
    Named(String),
    /// Already-resolved queue handle
    Handle(QueueHandle),
}

impl Destination {
    /// Queue name for either variant
    pub fn name(&self) -> &str {
        match self {
            Destination::Named(name) => name,
            Destination::Handle(handle) => handle.name(),
        }
    }
}

impl From<QueueHandle> for Destination {
    fn from(handle: QueueHandle) -> Self {
        Destination::Handle(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_name() {
        let named = Destination::Named("orders_queue".to_string());
        assert_eq!(named.name(), "orders_queue");

        let handle = QueueHandle::new("inventory_queue");
        let dest: Destination = handle.clone().into();
        assert_eq!(dest.name(), "inventory_queue");
        assert_eq!(handle.name(), "inventory_queue");
    }
}
