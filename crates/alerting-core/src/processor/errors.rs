use crate::{
    alerts::AlertError,
    ports::{StorageError, StreamError},
};

/// Why persisting an alert or publishing an event did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error(transparent)]
    Encode(#[from] AlertError),

    #[error("Failed to encode event: {0}")]
    EventEncode(#[source] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The snapshot was written but could not be published on the store topic.
    #[error("Snapshot stored but not mirrored: {0}")]
    Mirror(#[source] StreamError),
}

/// Errors that stop the processing loop.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// An error event could not be published, so a failure would go unreported.
    #[error("Failed to report error for alert {alert_id}: {source}")]
    Unreported {
        alert_id: String,
        #[source]
        source: CommitError,
    },

    /// A transition could not be committed under the halt policy.
    #[error("Transition for alert {alert_id} failed: {source}")]
    Transition {
        alert_id: String,
        #[source]
        source: CommitError,
    },
}

impl ProcessError {
    #[must_use]
    pub fn alert_id(&self) -> &str {
        match self {
            Self::Unreported { alert_id, .. } | Self::Transition { alert_id, .. } => alert_id,
        }
    }
}
