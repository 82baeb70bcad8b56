//! Lifecycle events emitted by the reconciliation processor.
//!
//! Events are constructed fresh per occurrence, never mutated, and always
//! serialized before they leave the core.

pub mod builder;
pub mod types;

pub use builder::{build_event, error_event, firing_event, refire_event, resolved_event};
pub use types::{EventAction, EventType, LifecycleEvent, SERVICE_NAME};
