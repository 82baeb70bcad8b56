use std::fmt;

use serde::Serialize;

use crate::alerts::AlertField;

/// What reconciling one alert decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reconciliation {
    /// First sighting of a firing alert; persisted without an event.
    StoredNew,
    /// First sighting of a resolved alert; reported, not persisted.
    RejectedResolvedNew,
    /// Identical to the stored snapshot.
    Unchanged,
    Resolved,
    Fired,
    /// Same firing state but a later start: the condition quiesced and came back.
    Refired { incoming_id: String, stored_id: String },
    /// Same firing state, other fields differ. Audit only.
    FieldsChanged(Vec<AlertField>),
    /// The stored snapshot could not be decoded.
    LookupFailed,
    /// Persisting or publishing a transition failed and was reported.
    TransitionFailed,
}

impl Reconciliation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoredNew => "stored_new",
            Self::RejectedResolvedNew => "rejected_resolved_new",
            Self::Unchanged => "unchanged",
            Self::Resolved => "resolved",
            Self::Fired => "fired",
            Self::Refired { .. } => "refired",
            Self::FieldsChanged(_) => "fields_changed",
            Self::LookupFailed => "lookup_failed",
            Self::TransitionFailed => "transition_failed",
        }
    }

    /// Whether the decision wrote to storage.
    #[must_use]
    pub fn persisted(&self) -> bool {
        matches!(self, Self::StoredNew | Self::Resolved | Self::Fired)
    }
}

impl fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refired { incoming_id, stored_id } => {
                write!(f, "refired: incoming {incoming_id}, stored {stored_id}")
            }
            Self::FieldsChanged(fields) => {
                let names: Vec<_> = fields.iter().map(AlertField::as_str).collect();
                write!(f, "fields changed: {}", names.join(", "))
            }
            other => f.write_str(other.as_str()),
        }
    }
}

/// Per-outcome tally of one `process` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub processed: u64,
    pub stored_new: u64,
    pub rejected_resolved_new: u64,
    pub unchanged: u64,
    pub resolved: u64,
    pub fired: u64,
    pub refired: u64,
    pub fields_changed: u64,
    pub lookup_failed: u64,
    pub transition_failed: u64,
}

impl ProcessSummary {
    pub fn record(&mut self, outcome: &Reconciliation) {
        self.processed += 1;
        let slot = match outcome {
            Reconciliation::StoredNew => &mut self.stored_new,
            Reconciliation::RejectedResolvedNew => &mut self.rejected_resolved_new,
            Reconciliation::Unchanged => &mut self.unchanged,
            Reconciliation::Resolved => &mut self.resolved,
            Reconciliation::Fired => &mut self.fired,
            Reconciliation::Refired { .. } => &mut self.refired,
            Reconciliation::FieldsChanged(_) => &mut self.fields_changed,
            Reconciliation::LookupFailed => &mut self.lookup_failed,
            Reconciliation::TransitionFailed => &mut self.transition_failed,
        };
        *slot += 1;
    }

    /// Adds another summary's counts into this one.
    pub fn merge(&mut self, other: &Self) {
        self.processed += other.processed;
        self.stored_new += other.stored_new;
        self.rejected_resolved_new += other.rejected_resolved_new;
        self.unchanged += other.unchanged;
        self.resolved += other.resolved;
        self.fired += other.fired;
        self.refired += other.refired;
        self.fields_changed += other.fields_changed;
        self.lookup_failed += other.lookup_failed;
        self.transition_failed += other.transition_failed;
    }
}
