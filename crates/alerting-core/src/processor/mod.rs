//! Reconciliation processor.
//!
//! Compares each incoming alert with the last persisted snapshot for its id and
//! decides one [`Reconciliation`]:
//!
//! | Stored snapshot | Incoming | Result |
//! |-----------------|----------|--------|
//! | none | firing | persist, no event |
//! | none | resolved | `log`/`error` event, nothing persisted |
//! | undecodable | any | `log`/`error` event |
//! | equal | equal | nothing |
//! | firing | resolved | persist, `event`/`resolved` |
//! | resolved | firing | persist, `event`/`firing` |
//! | same state, later start | | re-fire report, nothing persisted |
//! | same state, other fields | | field diff report, nothing persisted |
//!
//! Every storage write and stream publish goes through one [`RetryPolicy`]. A
//! transition that still fails is reported as an error event; only a failed error
//! report (or any failure under [`FailurePolicy::Halt`]) ends the loop.
//!
//! A transition is the snapshot write plus its lifecycle event. Mirroring the
//! snapshot on the store topic comes last and a mirror failure is reported as its
//! own error event without undoing or hiding the transition.

pub mod errors;
pub mod outcome;
pub mod retry;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    alerts::Alert,
    events::{self, LifecycleEvent},
    metrics,
    ports::{Storage, Stream, Topics},
};

pub use errors::{CommitError, ProcessError};
pub use outcome::{ProcessSummary, Reconciliation};
pub use retry::{RetryConfig, RetryPolicy};

/// Message of the error event emitted for a first-seen resolved alert.
pub const RESOLVED_NEW_MESSAGE: &str = "alert not stored, new alert with Resolved status";

/// What to do when a transition cannot be committed after retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Report an error event and keep consuming.
    #[default]
    Report,
    /// Report an error event, then stop.
    Halt,
}

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Expiry attached to stored snapshots.
    pub ttl: Option<Duration>,
    /// Also publish every persisted snapshot on the store topic.
    pub mirror_to_store_topic: bool,
    /// Publish an `event`/`alert` event on re-fire.
    pub report_refire: bool,
    pub failure_policy: FailurePolicy,
    pub retry: RetryPolicy,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            mirror_to_store_topic: true,
            report_refire: false,
            failure_policy: FailurePolicy::Report,
            retry: RetryPolicy::default(),
        }
    }
}

/// Decides state transitions for incoming alerts.
///
/// A processor holds no per-alert state; several can share the same ports as
/// long as each alert id is routed to exactly one of them.
#[derive(Clone)]
pub struct Processor {
    storage: Arc<dyn Storage>,
    stream: Arc<dyn Stream>,
    topics: Topics,
    options: ProcessorOptions,
}

impl Processor {
    pub fn new(
        storage: Arc<dyn Storage>,
        stream: Arc<dyn Stream>,
        topics: Topics,
        options: ProcessorOptions,
    ) -> Self {
        Self { storage, stream, topics, options }
    }

    #[must_use]
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    #[must_use]
    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Consumes alerts in arrival order until the channel closes.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProcessError`]; no further alerts are read after it.
    pub async fn process(
        &self,
        mut incoming: mpsc::Receiver<Alert>,
    ) -> Result<ProcessSummary, ProcessError> {
        let mut summary = ProcessSummary::default();

        while let Some(alert) = incoming.recv().await {
            match self.reconcile(alert).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    error!(
                        alert_id = %e.alert_id(),
                        error = %e,
                        processed = summary.processed,
                        "processing stopped"
                    );
                    return Err(e);
                }
            }
        }

        debug!(processed = summary.processed, "input closed");
        Ok(summary)
    }

    /// Decides, persists and reports one alert.
    ///
    /// # Errors
    ///
    /// See [`ProcessError`].
    pub async fn reconcile(&self, alert: Alert) -> Result<Reconciliation, ProcessError> {
        let outcome = self.decide(alert).await?;
        metrics::record_reconciliation(&outcome);
        Ok(outcome)
    }

    async fn decide(&self, alert: Alert) -> Result<Reconciliation, ProcessError> {
        let stored = match self.storage.get(alert.id()).await {
            Ok(stored) => stored,
            Err(e) => {
                metrics::record_transport_failure("storage_get");
                warn!(alert_id = %alert.id(), error = %e, "storage read failed, treating alert as new");
                None
            }
        };

        let Some(bytes) = stored else {
            return self.admit_new(alert).await;
        };

        let prior = match Alert::from_bytes(&bytes) {
            Ok(prior) => prior,
            Err(e) => {
                warn!(alert_id = %alert.id(), error = %e, "stored snapshot is unreadable");
                self.report_error(alert.id(), &e).await?;
                return Ok(Reconciliation::LookupFailed);
            }
        };

        if alert.same_as(&prior) {
            debug!(alert_id = %alert.id(), "alert unchanged");
            return Ok(Reconciliation::Unchanged);
        }

        if alert.is_firing() != prior.is_firing() {
            return if alert.is_firing() { self.fire(alert).await } else { self.resolve(alert).await };
        }

        if alert.starts_later_than(&prior) {
            return self.refired(&alert, &prior).await;
        }

        let fields = alert.differing_fields(&prior);
        let names: Vec<_> = fields.iter().map(|f| f.as_str()).collect();
        info!(alert_id = %alert.id(), fields = ?names, "alert fields changed without state change");
        Ok(Reconciliation::FieldsChanged(fields))
    }

    async fn admit_new(&self, alert: Alert) -> Result<Reconciliation, ProcessError> {
        if !alert.is_firing() {
            info!(alert_id = %alert.id(), "rejecting new alert with resolved status");
            self.report_error(alert.id(), &RESOLVED_NEW_MESSAGE).await?;
            return Ok(Reconciliation::RejectedResolvedNew);
        }

        match self.store(&alert).await {
            Ok(bytes) => {
                debug!(alert_id = %alert.id(), "stored new firing alert");
                self.mirror(alert.id(), &bytes).await?;
                Ok(Reconciliation::StoredNew)
            }
            Err(e) => self.transition_failed(alert.id(), e).await,
        }
    }

    async fn resolve(&self, mut alert: Alert) -> Result<Reconciliation, ProcessError> {
        let start = alert.timestamp.start;
        let end = alert.timestamp.end.filter(|end| *end >= start).unwrap_or_else(Utc::now);
        alert.resolve(end);

        match self.commit(&alert, &events::resolved_event(alert.id())).await {
            Ok(bytes) => {
                info!(alert_id = %alert.id(), end = %end, "alert resolved");
                self.mirror(alert.id(), &bytes).await?;
                Ok(Reconciliation::Resolved)
            }
            Err(e) => self.transition_failed(alert.id(), e).await,
        }
    }

    async fn fire(&self, mut alert: Alert) -> Result<Reconciliation, ProcessError> {
        alert.fire();

        match self.commit(&alert, &events::firing_event(alert.id())).await {
            Ok(bytes) => {
                info!(alert_id = %alert.id(), "alert firing");
                self.mirror(alert.id(), &bytes).await?;
                Ok(Reconciliation::Fired)
            }
            Err(e) => self.transition_failed(alert.id(), e).await,
        }
    }

    async fn refired(&self, alert: &Alert, prior: &Alert) -> Result<Reconciliation, ProcessError> {
        info!(
            alert_id = %alert.id(),
            stored_id = %prior.id(),
            start = %alert.timestamp.start,
            stored_start = %prior.timestamp.start,
            "alert re-fired"
        );

        if self.options.report_refire {
            let event = events::refire_event(alert.id(), prior.id());
            if let Err(e) = self.publish_event(&event).await {
                return self.transition_failed(alert.id(), e).await;
            }
        }

        Ok(Reconciliation::Refired {
            incoming_id: alert.id().to_string(),
            stored_id: prior.id().to_string(),
        })
    }

    /// Writes the snapshot, then publishes the lifecycle event. Returns the stored bytes.
    async fn commit(&self, alert: &Alert, event: &LifecycleEvent) -> Result<Vec<u8>, CommitError> {
        let bytes = self.store(alert).await?;
        self.publish_event(event).await?;
        Ok(bytes)
    }

    async fn store(&self, alert: &Alert) -> Result<Vec<u8>, CommitError> {
        let bytes = alert.to_bytes()?;
        let id = alert.id();
        let ttl = self.options.ttl;

        self.options.retry.run("storage_set", || self.storage.set(id, &bytes, ttl)).await?;
        Ok(bytes)
    }

    /// Publishes a stored snapshot on the store topic.
    ///
    /// Runs after the transition is committed, so a failure is reported on its own and
    /// never turns the outcome into [`Reconciliation::TransitionFailed`].
    async fn mirror(&self, alert_id: &str, bytes: &[u8]) -> Result<(), ProcessError> {
        if !self.options.mirror_to_store_topic {
            return Ok(());
        }

        let topic = self.topics.store.as_str();
        match self.options.retry.run("store_publish", || self.stream.publish(topic, bytes)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(alert_id, topic, error = %e, "snapshot stored but not mirrored");
                self.report_error(alert_id, &CommitError::Mirror(e)).await
            }
        }
    }

    async fn publish_event(&self, event: &LifecycleEvent) -> Result<(), CommitError> {
        let bytes = event.to_bytes().map_err(CommitError::EventEncode)?;
        let topic = self.topics.event.as_str();

        self.options.retry.run("event_publish", || self.stream.publish(topic, &bytes)).await?;
        metrics::record_event_published(event.action());
        Ok(())
    }

    /// Publishes a `log`/`error` event for `alert_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Unreported`] if the event cannot be published.
    pub async fn report_error(
        &self,
        alert_id: &str,
        error: &(impl std::fmt::Display + ?Sized),
    ) -> Result<(), ProcessError> {
        let event = events::error_event(alert_id, &error);
        self.publish_event(&event).await.map_err(|source| {
            error!(alert_id, error = %source, "failed to publish error event");
            ProcessError::Unreported { alert_id: alert_id.to_string(), source }
        })
    }

    async fn transition_failed(
        &self,
        alert_id: &str,
        failure: CommitError,
    ) -> Result<Reconciliation, ProcessError> {
        error!(alert_id, error = %failure, "transition could not be committed");
        self.report_error(alert_id, &failure).await?;

        match self.options.failure_policy {
            FailurePolicy::Report => Ok(Reconciliation::TransitionFailed),
            FailurePolicy::Halt => {
                Err(ProcessError::Transition { alert_id: alert_id.to_string(), source: failure })
            }
        }
    }
}
