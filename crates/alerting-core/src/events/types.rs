//! Lifecycle event definitions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier stamped on every event this subsystem emits.
pub const SERVICE_NAME: &str = "alerting";

/// Whether an event is a diagnostic log or a lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "LOG")]
    Log,
    #[serde(rename = "EVENT")]
    Event,
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "LOG",
            Self::Event => "EVENT",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Error,
    Firing,
    Resolved,
    Alert,
}

impl EventAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Firing => "firing",
            Self::Resolved => "resolved",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A write-once record describing a reconciliation outcome.
///
/// Fields are private: an event is built once by [`build_event`](super::build_event)
/// and only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "Type")]
    event_type: EventType,
    #[serde(rename = "Timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "Action")]
    action: EventAction,
    #[serde(rename = "Message")]
    message: Map<String, Value>,
}

impl LifecycleEvent {
    pub(super) fn new(
        event_type: EventType,
        timestamp: DateTime<Utc>,
        action: EventAction,
        message: Map<String, Value>,
    ) -> Self {
        Self { service: SERVICE_NAME.to_string(), event_type, timestamp, action, message }
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn action(&self) -> EventAction {
        self.action
    }

    #[must_use]
    pub fn message(&self) -> &Map<String, Value> {
        &self.message
    }

    /// The `alert_id` entry of the message, if it is a string.
    #[must_use]
    pub fn alert_id(&self) -> Option<&str> {
        self.message.get("alert_id").and_then(Value::as_str)
    }

    /// Encodes the event for publishing.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if an `extra` value cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes an event published by this or another service.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error for malformed payloads.
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
