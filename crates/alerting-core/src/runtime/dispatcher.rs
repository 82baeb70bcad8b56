//! Routes alerts to a fixed set of bounded worker queues.
//!
//! An alert id always hashes to the same queue, so one worker sees every
//! observation of that alert in arrival order.

use std::hash::BuildHasher;

use ahash::RandomState;
use tokio::sync::mpsc;

use crate::alerts::Alert;

// Fixed seeds keep routing identical across restarts.
const ROUTING_SEEDS: [u64; 4] =
    [0x243f_6a88_85a3_08d3, 0x1319_8a2e_0370_7344, 0xa409_3822_299f_31d0, 0x082e_fa98_ec4e_6c89];

#[derive(Debug, thiserror::Error)]
#[error("Worker {worker} is no longer accepting alerts (alert {alert_id})")]
pub struct DispatchError {
    pub worker: usize,
    pub alert_id: String,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    queues: Vec<mpsc::Sender<Alert>>,
    hasher: RandomState,
}

impl Dispatcher {
    /// Creates `workers` queues of `capacity` each and returns their receiving ends
    /// in worker order. Both values are clamped to at least one.
    #[must_use]
    pub fn new(workers: usize, capacity: usize) -> (Self, Vec<mpsc::Receiver<Alert>>) {
        let (queues, receivers): (Vec<_>, Vec<_>) =
            (0..workers.max(1)).map(|_| mpsc::channel(capacity.max(1))).unzip();
        let [k0, k1, k2, k3] = ROUTING_SEEDS;

        (Self { queues, hasher: RandomState::with_seeds(k0, k1, k2, k3) }, receivers)
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.queues.len()
    }

    /// Index of the worker that owns `alert_id`.
    #[must_use]
    pub fn worker_for(&self, alert_id: &str) -> usize {
        let hash = BuildHasher::hash_one(&self.hasher, alert_id);
        #[allow(clippy::cast_possible_truncation)]
        let index = (hash % self.queues.len() as u64) as usize;
        index
    }

    /// Queues the alert for its worker, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the worker has stopped.
    pub async fn dispatch(&self, alert: Alert) -> Result<usize, DispatchError> {
        let worker = self.worker_for(alert.id());
        self.queues[worker].send(alert).await.map_err(|rejected| DispatchError {
            worker,
            alert_id: rejected.0.id,
        })?;
        Ok(worker)
    }
}
