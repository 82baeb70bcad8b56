use alerting_core::{
    config::AppConfig,
    metrics::install_prometheus_exporter,
    runtime::{AlertingRuntime, ShutdownReport},
};
use anyhow::Result;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the logging system based on the configuration.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.logging.level.as_str();
        EnvFilter::new(format!("warn,alerting_core={level},alerting_server={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json();
        registry.with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!(environment = %config.environment, "Starting alerting service");
    debug!(
        broker = config.broker.backend.as_str(),
        storage = config.storage.backend.as_str(),
        workers = config.processor.workers,
        "Configuration loaded"
    );

    if config.metrics.enabled {
        if let Some(port) = config.metrics.prometheus_port {
            install_prometheus_exporter(port)
                .map_err(|e| anyhow::anyhow!("Failed to start Prometheus exporter: {e}"))?;
        }
    }

    let mut runtime = AlertingRuntime::builder().with_config(config).build()?;
    runtime.start().await?;

    tokio::select! {
        () = shutdown_signal() => info!("Termination signal received"),
        () = runtime.wait_for_signal() => warn!("Runtime requested shutdown"),
    }

    let report = runtime.shutdown().await;
    log_report(&report);

    if report.is_clean() {
        info!("Server shutdown complete");
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Alerting runtime stopped with {} failure(s) and {} aborted task(s)",
            report.failures.len(),
            report.aborted_tasks
        ))
    }
}

fn log_report(report: &ShutdownReport) {
    let summary = &report.summary;
    info!(
        received = report.intake.received,
        rejected = report.intake.rejected,
        processed = summary.processed,
        stored_new = summary.stored_new,
        resolved = summary.resolved,
        fired = summary.fired,
        refired = summary.refired,
        fields_changed = summary.fields_changed,
        transition_failed = summary.transition_failed,
        "Processing summary"
    );
    for failure in &report.failures {
        error!(alert_id = %failure.alert_id(), error = %failure, "Task failed");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(
                error = %e,
                "Failed to install Ctrl+C handler"
            );
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(
                    error = %e,
                    "Failed to install signal handler"
                );

                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
