//! # Metrics
//!
//! Counters are recorded through the `metrics` facade, so they are free when no
//! recorder is installed. The server installs a Prometheus recorder with an HTTP
//! listener via [`install_prometheus_exporter`].
//!
//! | Counter | Labels |
//! |---------|--------|
//! | `alerting_reconciliations_total` | `outcome` |
//! | `alerting_events_published_total` | `action` |
//! | `alerting_transport_failures_total` | `operation` |
//! | `alerting_intake_decode_failures_total` | |

use std::net::{Ipv4Addr, SocketAddr};

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::{events::EventAction, processor::Reconciliation};

/// Label value for a metric dimension.
pub trait MetricsLabel {
    fn as_metric_str(&self) -> &'static str;
}

impl MetricsLabel for Reconciliation {
    fn as_metric_str(&self) -> &'static str {
        self.as_str()
    }
}

impl MetricsLabel for EventAction {
    fn as_metric_str(&self) -> &'static str {
        self.as_str()
    }
}

pub fn record_reconciliation(outcome: &Reconciliation) {
    counter!("alerting_reconciliations_total", "outcome" => outcome.as_metric_str()).increment(1);
}

pub fn record_event_published(action: EventAction) {
    counter!("alerting_events_published_total", "action" => action.as_metric_str()).increment(1);
}

pub fn record_transport_failure(operation: &'static str) {
    counter!("alerting_transport_failures_total", "operation" => operation).increment(1);
}

pub fn record_intake_decode_failure() {
    counter!("alerting_intake_decode_failures_total").increment(1);
}

/// Installs the global Prometheus recorder and serves it on `0.0.0.0:port`.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or the listener cannot bind.
pub fn install_prometheus_exporter(port: u16) -> Result<SocketAddr, BuildError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(addr)
}
