//! Runtime lifecycle: worker and intake tasks plus graceful shutdown.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{
    builder::{AlertingRuntimeBuilder, RuntimeError},
    dispatcher::Dispatcher,
    intake::{self, IntakeStats},
    AlertingComponents,
};
use crate::{
    config::AppConfig,
    processor::{ProcessError, ProcessSummary},
};

/// What the tasks reported when the runtime stopped.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub intake: IntakeStats,
    /// Outcome counts summed over every worker that finished cleanly.
    pub summary: ProcessSummary,
    /// Fatal errors returned by the intake or a worker.
    pub failures: Vec<ProcessError>,
    /// Tasks that panicked or were cancelled.
    pub aborted_tasks: usize,
}

impl ShutdownReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.aborted_tasks == 0
    }
}

struct RuntimeTasks {
    intake: JoinHandle<Result<IntakeStats, ProcessError>>,
    workers: Vec<JoinHandle<Result<ProcessSummary, ProcessError>>>,
}

/// Owns the components and background tasks of a running alerting service.
///
/// [`start`](Self::start) subscribes to the intake topic and spawns one task per
/// worker. A fatal error in any task broadcasts the shutdown signal, so
/// [`wait_for_shutdown`](Self::wait_for_shutdown) returns on either an external or
/// an internal stop.
pub struct AlertingRuntime {
    components: AlertingComponents,
    shutdown_tx: broadcast::Sender<()>,
    // Created with the runtime so a signal sent before anyone waits is not lost.
    signal_rx: broadcast::Receiver<()>,
    config: AppConfig,
    tasks: Option<RuntimeTasks>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl AlertingRuntime {
    #[must_use]
    pub fn builder() -> AlertingRuntimeBuilder {
        AlertingRuntimeBuilder::new()
    }

    pub(super) fn new(
        components: AlertingComponents,
        shutdown_tx: broadcast::Sender<()>,
        config: AppConfig,
    ) -> Self {
        let signal_rx = shutdown_tx.subscribe();
        Self {
            components,
            shutdown_tx,
            signal_rx,
            config,
            tasks: None,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn components(&self) -> &AlertingComponents {
        &self.components
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Whether tasks have been started and not yet shut down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tasks.is_some()
    }

    /// Creates a new shutdown receiver for external shutdown coordination.
    #[must_use]
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Broadcasts the shutdown signal without waiting for the tasks.
    pub fn trigger_shutdown(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!(error = %e, "Failed to send shutdown signal (no receivers)");
        }
    }

    /// Subscribes to the intake topic and spawns the intake and worker tasks.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::AlreadyStarted`] on a second call, or
    /// [`RuntimeError::Stream`] if the intake subscription fails.
    pub async fn start(&mut self) -> Result<(), RuntimeError> {
        if self.tasks.is_some() || self.shutdown_initiated.load(Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyStarted);
        }

        let processor_config = &self.config.processor;
        let (payload_tx, payload_rx) = mpsc::channel(processor_config.queue_capacity);
        self.components.stream().subscribe(&self.config.topics.intake, payload_tx).await?;
        debug!(topic = %self.config.topics.intake, "Subscribed to intake topic");

        let (dispatcher, receivers) =
            Dispatcher::new(processor_config.workers, processor_config.queue_capacity);

        let workers = receivers
            .into_iter()
            .enumerate()
            .map(|(worker, queue)| {
                let processor = self.components.processor().clone();
                self.spawn_supervised("worker", async move {
                    debug!(worker, "Worker started");
                    let result = processor.process(queue).await;
                    debug!(worker, ok = result.is_ok(), "Worker finished");
                    result
                })
            })
            .collect();

        let intake = self.spawn_supervised(
            "intake",
            intake::run(
                payload_rx,
                dispatcher,
                self.components.processor().clone(),
                self.shutdown_tx.subscribe(),
            ),
        );

        self.tasks = Some(RuntimeTasks { intake, workers });
        info!(
            workers = processor_config.workers,
            intake = %self.config.topics.intake,
            events = %self.config.topics.event,
            "Alerting runtime started"
        );
        Ok(())
    }

    /// Spawns `task`, broadcasting shutdown if it returns an error.
    fn spawn_supervised<T, F>(
        &self,
        name: &'static str,
        task: F,
    ) -> JoinHandle<Result<T, ProcessError>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ProcessError>> + Send + 'static,
    {
        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            let result = task.await;
            if let Err(e) = &result {
                error!(task = name, error = %e, "Fatal error, signalling shutdown");
                let _ = shutdown_tx.send(());
            }
            result
        })
    }

    /// Stops intake, lets the workers drain their queues and collects their reports.
    ///
    /// Idempotent: later calls return an empty report.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Shutdown already initiated, ignoring duplicate call");
            return report;
        }

        info!("Initiating alerting runtime shutdown");
        self.trigger_shutdown();

        let Some(tasks) = self.tasks.take() else {
            info!("Alerting runtime was never started");
            return report;
        };

        // Intake returns first and drops the dispatcher, closing every worker queue.
        match tasks.intake.await {
            Ok(Ok(stats)) => report.intake = stats,
            Ok(Err(e)) => report.failures.push(e),
            Err(e) => {
                error!(error = %e, "Intake task terminated abnormally");
                report.aborted_tasks += 1;
            }
        }

        for (worker, handle) in tasks.workers.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(summary)) => report.summary.merge(&summary),
                Ok(Err(e)) => report.failures.push(e),
                Err(e) => {
                    error!(worker, error = %e, "Worker task terminated abnormally");
                    report.aborted_tasks += 1;
                }
            }
        }

        info!(
            processed = report.summary.processed,
            failures = report.failures.len(),
            "Alerting runtime shutdown complete"
        );
        report
    }

    /// Resolves once the shutdown signal has been broadcast, by
    /// [`trigger_shutdown`](Self::trigger_shutdown) or by a failing task.
    pub async fn wait_for_signal(&mut self) {
        match self.signal_rx.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Shutdown channel closed");
            }
        }
    }

    /// Waits for the shutdown signal, then performs cleanup.
    pub async fn wait_for_shutdown(&mut self) -> ShutdownReport {
        self.wait_for_signal().await;
        info!("Shutdown signal received, runtime terminating");
        self.shutdown().await
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    let _ = assert_send::<AlertingRuntime>;
    let _ = assert_sync::<AlertingRuntime>;
};
