//! Test Helper Functions and Utilities
//!
//! Common helpers for creating alerts, processors and runtime configurations.

use std::sync::Arc;

use alerting_core::{
    alerts::Alert,
    config::AppConfig,
    ports::Topics,
    processor::{Processor, ProcessorOptions, RetryPolicy},
};
use chrono::{DateTime, Duration, Utc};

use super::{RecordingStorage, RecordingStream};

/// Fixed start instant used by every fixture alert.
#[must_use]
pub fn test_start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
        .expect("valid RFC 3339 literal")
        .with_timezone(&Utc)
}

/// A firing alert starting at [`test_start`].
#[must_use]
pub fn firing_alert(id: &str) -> Alert {
    Alert::new(id, "disk", "disk full on /var", test_start(), true)
}

/// A resolved alert starting at [`test_start`] and ending `minutes` later.
#[must_use]
pub fn resolved_alert(id: &str, minutes: i64) -> Alert {
    let mut alert = firing_alert(id);
    alert.resolve(test_start() + Duration::minutes(minutes));
    alert
}

/// Processor options with immediate retries, so fault-injection tests run fast.
#[must_use]
pub fn fast_options(max_retries: u32) -> ProcessorOptions {
    ProcessorOptions { retry: RetryPolicy::immediate(max_retries), ..ProcessorOptions::default() }
}

/// A processor wired to recording ports with the default topics.
#[must_use]
pub fn recording_processor(
    storage: &RecordingStorage,
    stream: &RecordingStream,
    options: ProcessorOptions,
) -> Processor {
    Processor::new(Arc::new(storage.clone()), Arc::new(stream.clone()), Topics::default(), options)
}

/// A runtime configuration with `workers` workers and immediate retries.
#[must_use]
pub fn runtime_config(workers: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.processor.workers = workers;
    config.processor.queue_capacity = 64;
    config.processor.retry.base_delay_ms = 0;
    config.processor.retry.max_delay_ms = 0;
    config
}
