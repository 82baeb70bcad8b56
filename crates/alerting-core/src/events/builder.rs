//! Event construction.
//!
//! Every event starts from [`build_event`]; the other constructors are thin
//! specializations for the outcomes the processor reports.

use std::fmt::Display;

use chrono::Utc;
use serde_json::{Map, Value};

use super::types::{EventAction, EventType, LifecycleEvent};

/// Builds an event stamped with the current time.
///
/// The message is seeded with `alert_id` and then overlaid with `extra`; a key in
/// `extra` wins over the seed.
#[must_use]
pub fn build_event(
    alert_id: &str,
    action: EventAction,
    event_type: EventType,
    extra: Map<String, Value>,
) -> LifecycleEvent {
    let mut message = Map::new();
    message.insert("alert_id".to_string(), Value::String(alert_id.to_string()));
    message.extend(extra);

    LifecycleEvent::new(event_type, Utc::now(), action, message)
}

/// `LOG`/`error` event carrying `error_message`.
#[must_use]
pub fn error_event(alert_id: &str, error: &impl Display) -> LifecycleEvent {
    let mut extra = Map::new();
    extra.insert("error_message".to_string(), Value::String(error.to_string()));
    build_event(alert_id, EventAction::Error, EventType::Log, extra)
}

#[must_use]
pub fn firing_event(alert_id: &str) -> LifecycleEvent {
    build_event(alert_id, EventAction::Firing, EventType::Event, Map::new())
}

#[must_use]
pub fn resolved_event(alert_id: &str) -> LifecycleEvent {
    build_event(alert_id, EventAction::Resolved, EventType::Event, Map::new())
}

/// `EVENT`/`alert` event reporting that a quiesced condition started again.
#[must_use]
pub fn refire_event(incoming_id: &str, stored_id: &str) -> LifecycleEvent {
    let mut extra = Map::new();
    extra.insert("stored_alert_id".to_string(), Value::String(stored_id.to_string()));
    build_event(incoming_id, EventAction::Alert, EventType::Event, extra)
}
