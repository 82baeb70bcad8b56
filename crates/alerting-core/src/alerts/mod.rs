//! Alert entities.
//!
//! Two schema variants share this module:
//!
//! - **[`Alert`]**: the v1 record the reconciliation processor operates on
//! - **[`AlertV2`]**: the extended record with severity, labels, annotations and actions
//!
//! ## Usage
//!
//! ```rust
//! use alerting_core::alerts::{Alert, AlertV2, AlertState, Severity};
//! use chrono::Utc;
//!
//! let mut alert = Alert::new("a2b87da92118eb5c", "disk", "disk full", Utc::now(), true);
//! alert.acknowledge();
//! alert.resolve(Utc::now());
//! assert!(!alert.is_firing());
//!
//! let mut v2 = AlertV2::new(
//!     "a2b87da92118eb5c",
//!     "node-exporter",
//!     Severity::Warning,
//!     "disk_full",
//!     "disk full",
//!     "disk_full/node-1",
//!     Utc::now(),
//!     AlertState::Active,
//! );
//! assert!(v2.set_severity("urgent").is_err());
//! v2.add_label("env", "prod");
//! ```

pub mod types;
pub mod v2;

pub use types::{Alert, AlertField, Timestamp};
pub use v2::{Action, AlertState, AlertV2, Severity};

/// Errors produced by alert encoding, decoding and validation.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// Payload is corrupt or not a recognized alert schema.
    #[error("Failed to decode alert: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode alert: {0}")]
    Encode(#[source] serde_json::Error),

    /// Severity outside the closed set `critical`, `warning`, `info`.
    #[error("Invalid severity level: {0}")]
    InvalidSeverity(String),
}
