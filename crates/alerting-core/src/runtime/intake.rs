//! Intake pipeline: raw payloads from the intake topic to worker queues.

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use super::dispatcher::Dispatcher;
use crate::{
    alerts::{Alert, AlertError},
    metrics,
    processor::{ProcessError, Processor},
};

/// Alert id used in error events when the payload carries none.
pub const UNKNOWN_ALERT_ID: &str = "unknown";

/// Counts kept by one intake run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    pub received: u64,
    pub dispatched: u64,
    pub rejected: u64,
}

/// Best-effort `id` of a payload that failed to decode as an alert.
#[must_use]
pub fn extract_alert_id(payload: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(payload).ok()?;
    match value.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decodes one intake payload, reporting it through `reporter` if it is not an alert.
///
/// Returns `Ok(None)` for a reported rejection.
///
/// # Errors
///
/// Returns [`ProcessError::Unreported`] if the rejection could not be reported.
pub async fn decode_payload(
    reporter: &Processor,
    payload: &[u8],
) -> Result<Option<Alert>, ProcessError> {
    match Alert::from_bytes(payload) {
        Ok(alert) => Ok(Some(alert)),
        Err(e) => {
            reject(reporter, payload, &e).await?;
            Ok(None)
        }
    }
}

async fn reject(reporter: &Processor, payload: &[u8], e: &AlertError) -> Result<(), ProcessError> {
    metrics::record_intake_decode_failure();
    let alert_id = extract_alert_id(payload).unwrap_or_else(|| UNKNOWN_ALERT_ID.to_string());
    warn!(alert_id = %alert_id, error = %e, bytes = payload.len(), "dropping undecodable intake payload");
    reporter.report_error(&alert_id, e).await
}

/// Feeds decoded alerts to the dispatcher until the subscription ends or shutdown
/// is signalled. Dropping the dispatcher on return closes every worker queue.
///
/// On shutdown the subscription is closed and payloads already buffered in it are
/// still dispatched, so the workers drain everything that was received.
///
/// # Errors
///
/// Returns [`ProcessError::Unreported`] if a rejected payload could not be reported.
pub async fn run(
    mut payloads: mpsc::Receiver<Vec<u8>>,
    dispatcher: Dispatcher,
    reporter: Processor,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<IntakeStats, ProcessError> {
    let mut stats = IntakeStats::default();
    info!(workers = dispatcher.workers(), "intake started");

    loop {
        let payload = tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("intake received shutdown signal");
                payloads.close();
                break;
            }
            payload = payloads.recv() => match payload {
                Some(payload) => payload,
                None => {
                    info!("intake subscription closed");
                    break;
                }
            },
        };

        if !ingest(&payload, &dispatcher, &reporter, &mut stats).await? {
            return Ok(finish(stats));
        }
    }

    let mut drained = 0u64;
    while let Some(payload) = payloads.recv().await {
        drained += 1;
        if !ingest(&payload, &dispatcher, &reporter, &mut stats).await? {
            break;
        }
    }
    if drained > 0 {
        debug!(drained, "dispatched payloads buffered before shutdown");
    }

    Ok(finish(stats))
}

/// Decodes and dispatches one payload. Returns `false` once the workers are gone.
async fn ingest(
    payload: &[u8],
    dispatcher: &Dispatcher,
    reporter: &Processor,
    stats: &mut IntakeStats,
) -> Result<bool, ProcessError> {
    stats.received += 1;
    let Some(alert) = decode_payload(reporter, payload).await? else {
        stats.rejected += 1;
        return Ok(true);
    };

    match dispatcher.dispatch(alert).await {
        Ok(worker) => {
            stats.dispatched += 1;
            debug!(worker, "alert dispatched");
            Ok(true)
        }
        Err(e) => {
            error!(error = %e, "worker stopped, intake shutting down");
            Ok(false)
        }
    }
}

fn finish(stats: IntakeStats) -> IntakeStats {
    info!(
        received = stats.received,
        dispatched = stats.dispatched,
        rejected = stats.rejected,
        "intake stopped"
    );
    stats
}
