//! Integration tests for the reconciliation processor.
//!
//! These tests drive the public [`Processor`] API against recording ports and
//! assert on the exact side effects of each decision:
//! - how many snapshots were written and what they contain
//! - which lifecycle events were published, in which order
//! - how transport failures are retried, reported or escalated

use alerting_core::{
    alerts::{Alert, AlertField},
    events::{EventAction, EventType},
    ports::Topics,
    processor::{
        FailurePolicy, ProcessError, ProcessorOptions, Reconciliation, RESOLVED_NEW_MESSAGE,
    },
};
use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use crate::mock_infrastructure::{
    fast_options, firing_alert, recording_processor, resolved_alert, test_start, RecordingStorage,
    RecordingStream,
};

fn topics() -> Topics {
    Topics::default()
}

async fn stored(storage: &RecordingStorage, id: &str) -> Alert {
    let bytes = storage.snapshot(id).await.expect("snapshot stored");
    Alert::from_bytes(&bytes).expect("snapshot decodes")
}

#[tokio::test]
async fn test_full_lifecycle_write_and_event_counts() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));

    let steps = [
        (firing_alert("a1"), Reconciliation::StoredNew, 1),
        (firing_alert("a1"), Reconciliation::Unchanged, 1),
        (resolved_alert("a1", 5), Reconciliation::Resolved, 2),
        (resolved_alert("a1", 5), Reconciliation::Unchanged, 2),
        (firing_alert("a1"), Reconciliation::Fired, 3),
    ];

    for (alert, expected, writes) in steps {
        let outcome = processor.reconcile(alert).await.unwrap();
        assert_eq!(outcome, expected);
        assert_eq!(storage.write_count(), writes, "after {expected}");
    }

    let actions: Vec<_> = stream.events_on(&topics().event).iter().map(|e| e.action()).collect();
    assert_eq!(actions, vec![EventAction::Resolved, EventAction::Firing]);

    // Every persisted snapshot is mirrored, in write order.
    let mirrored = stream.published_on(&topics().store);
    assert_eq!(mirrored.len(), 3);
    let last = Alert::from_bytes(mirrored.last().unwrap()).unwrap();
    assert!(last.firing);
    assert_eq!(last.timestamp.end, None);
}

#[tokio::test]
async fn test_resolved_snapshot_keeps_producer_end_time() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));

    processor.reconcile(firing_alert("a1")).await.unwrap();
    processor.reconcile(resolved_alert("a1", 7)).await.unwrap();

    let snapshot = stored(&storage, "a1").await;
    assert!(!snapshot.firing);
    assert_eq!(snapshot.timestamp.end, Some(test_start() + Duration::minutes(7)));

    let events = stream.events_on(&topics().event);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), EventType::Event);
    assert_eq!(events[0].alert_id(), Some("a1"));
}

#[tokio::test]
async fn test_resolution_without_usable_end_uses_current_time() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    processor.reconcile(firing_alert("a1")).await.unwrap();

    let mut incoming = firing_alert("a1");
    incoming.firing = false;
    incoming.timestamp.end = Some(test_start() - Duration::minutes(1));

    let before = Utc::now();
    assert_eq!(processor.reconcile(incoming).await.unwrap(), Reconciliation::Resolved);

    let end = stored(&storage, "a1").await.timestamp.end.expect("end time set");
    assert!(end >= before);
}

#[tokio::test]
async fn test_new_resolved_alert_is_reported_not_stored() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));

    let outcome = processor.reconcile(resolved_alert("a1", 5)).await.unwrap();

    assert_eq!(outcome, Reconciliation::RejectedResolvedNew);
    assert_eq!(storage.write_count(), 0);
    assert!(stream.published_on(&topics().store).is_empty());

    let events = stream.events_on(&topics().event);
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].event_type(), events[0].action()), (EventType::Log, EventAction::Error));
    assert_eq!(events[0].message()["error_message"], RESOLVED_NEW_MESSAGE);
}

#[tokio::test]
async fn test_refire_is_reported_without_write() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    processor.reconcile(firing_alert("a1")).await.unwrap();

    let mut later = firing_alert("a1");
    later.timestamp.start = test_start() + Duration::hours(1);
    let outcome = processor.reconcile(later).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::Refired { incoming_id: "a1".to_string(), stored_id: "a1".to_string() }
    );
    assert_eq!(storage.write_count(), 1);
    assert!(stream.events_on(&topics().event).is_empty());
    assert_eq!(stored(&storage, "a1").await.timestamp.start, test_start());
}

#[tokio::test]
async fn test_refire_event_when_enabled() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let options = ProcessorOptions { report_refire: true, ..fast_options(0) };
    let processor = recording_processor(&storage, &stream, options);
    processor.reconcile(firing_alert("a1")).await.unwrap();

    let mut later = firing_alert("a1");
    later.timestamp.start = test_start() + Duration::hours(1);
    processor.reconcile(later).await.unwrap();

    let events = stream.events_on(&topics().event);
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].event_type(), events[0].action()), (EventType::Event, EventAction::Alert));
    assert_eq!(events[0].message()["stored_alert_id"], "a1");
}

#[tokio::test]
async fn test_field_changes_are_audit_only() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    processor.reconcile(firing_alert("a1")).await.unwrap();

    let mut renamed = firing_alert("a1");
    renamed.title = "disk (critical)".to_string();
    renamed.acknowledge();
    let outcome = processor.reconcile(renamed).await.unwrap();

    assert_eq!(
        outcome,
        Reconciliation::FieldsChanged(vec![AlertField::Title, AlertField::Acknowledged])
    );
    assert_eq!(storage.write_count(), 1);
    assert_eq!(stored(&storage, "a1").await.title, "disk");
    assert!(stream.events_on(&topics().event).is_empty());
}

#[tokio::test]
async fn test_corrupt_snapshot_reports_lookup_failure() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    storage.seed("a1", b"{ not an alert").await;

    let outcome = processor.reconcile(firing_alert("a1")).await.unwrap();

    assert_eq!(outcome, Reconciliation::LookupFailed);
    assert_eq!(storage.write_count(), 0);
    let events = stream.events_on(&topics().event);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action(), EventAction::Error);
    assert_eq!(events[0].alert_id(), Some("a1"));
}

#[tokio::test]
async fn test_process_continues_after_corrupt_snapshot() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    storage.seed("a1", b"{ not an alert").await;

    let (tx, rx) = mpsc::channel(8);
    tx.send(firing_alert("a1")).await.unwrap();
    tx.send(firing_alert("b1")).await.unwrap();
    drop(tx);

    let summary = processor.process(rx).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.lookup_failed, 1);
    assert_eq!(summary.stored_new, 1);
    assert_eq!(storage.writes(), vec!["b1".to_string()]);
    assert!(stored(&storage, "b1").await.firing);
    assert_eq!(stream.events_on(&topics().event).len(), 1);
}

#[tokio::test]
async fn test_storage_read_failure_treats_alert_as_new() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    storage.fail_next_gets(1);

    let outcome = processor.reconcile(firing_alert("a1")).await.unwrap();

    assert_eq!(outcome, Reconciliation::StoredNew);
    assert_eq!(storage.get_count(), 1);
    assert_eq!(storage.write_count(), 1);
}

#[tokio::test]
async fn test_transient_write_failures_are_retried() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(3));
    storage.fail_next_sets(2);

    let outcome = processor.reconcile(firing_alert("a1")).await.unwrap();

    assert_eq!(outcome, Reconciliation::StoredNew);
    assert_eq!(storage.write_count(), 1);
    assert!(stream.events_on(&topics().event).is_empty());
}

#[tokio::test]
async fn test_exhausted_write_is_reported_and_processing_continues() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(1));
    storage.fail_next_sets(2);

    let outcome = processor.reconcile(firing_alert("a1")).await.unwrap();

    assert_eq!(outcome, Reconciliation::TransitionFailed);
    assert_eq!(storage.write_count(), 0);
    let events = stream.events_on(&topics().event);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action(), EventAction::Error);
    let message = events[0].message()["error_message"].as_str().unwrap();
    assert!(message.contains("injected set failure"), "{message}");

    // The next alert for the same id is admitted once storage recovers.
    assert_eq!(processor.reconcile(firing_alert("a1")).await.unwrap(), Reconciliation::StoredNew);
}

#[tokio::test]
async fn test_halt_policy_escalates_transition_failure() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let options = ProcessorOptions { failure_policy: FailurePolicy::Halt, ..fast_options(0) };
    let processor = recording_processor(&storage, &stream, options);
    storage.fail_next_sets(1);

    let err = processor.reconcile(firing_alert("a1")).await.unwrap_err();

    assert!(matches!(err, ProcessError::Transition { .. }));
    assert_eq!(err.alert_id(), "a1");
    // Reported before escalating.
    assert_eq!(stream.events_on(&topics().event).len(), 1);
}

#[tokio::test]
async fn test_mirror_failure_keeps_transition_event() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(1));
    processor.reconcile(firing_alert("a1")).await.unwrap();

    stream.fail_topic(&topics().store);
    let outcome = processor.reconcile(resolved_alert("a1", 5)).await.unwrap();
    stream.heal_topic(&topics().store);

    assert_eq!(outcome, Reconciliation::Resolved);
    assert!(!stored(&storage, "a1").await.firing);

    let events = stream.events_on(&topics().event);
    let actions: Vec<_> = events.iter().map(|e| e.action()).collect();
    assert_eq!(actions, vec![EventAction::Resolved, EventAction::Error]);
    let message = events[1].message()["error_message"].as_str().unwrap();
    assert!(message.contains("not mirrored"), "{message}");

    // Replaying the alert finds the committed state.
    let replay = processor.reconcile(resolved_alert("a1", 5)).await.unwrap();
    assert_eq!(replay, Reconciliation::Unchanged);
    assert_eq!(stream.events_on(&topics().event).len(), 2);
}

#[tokio::test]
async fn test_mirror_failure_on_new_alert_still_stores_it() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let options = ProcessorOptions { failure_policy: FailurePolicy::Halt, ..fast_options(0) };
    let processor = recording_processor(&storage, &stream, options);
    stream.fail_topic(&topics().store);

    let outcome = processor.reconcile(firing_alert("a1")).await.unwrap();

    assert_eq!(outcome, Reconciliation::StoredNew);
    assert_eq!(storage.write_count(), 1);
    let events = stream.events_on(&topics().event);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action(), EventAction::Error);
    let message = events[0].message()["error_message"].as_str().unwrap();
    assert!(message.contains("stored but not mirrored"), "{message}");
}

#[tokio::test]
async fn test_unreportable_mirror_failure_is_fatal() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    stream.fail_topic(&topics().store);
    stream.fail_topic(&topics().event);

    let err = processor.reconcile(firing_alert("a1")).await.unwrap_err();

    assert!(matches!(err, ProcessError::Unreported { .. }));
    assert_eq!(storage.write_count(), 1);
}

#[tokio::test]
async fn test_unreportable_failure_is_fatal() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    processor.reconcile(firing_alert("a1")).await.unwrap();
    stream.fail_topic(&topics().event);

    let err = processor.reconcile(resolved_alert("a1", 5)).await.unwrap_err();

    assert!(matches!(err, ProcessError::Unreported { .. }));
    // The snapshot was written before the event publish failed.
    assert!(!stored(&storage, "a1").await.firing);
}

#[tokio::test]
async fn test_process_stops_at_first_fatal_error() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));
    stream.fail_topic(&topics().event);

    let (tx, rx) = mpsc::channel(8);
    tx.send(firing_alert("a1")).await.unwrap();
    tx.send(resolved_alert("b1", 5)).await.unwrap();
    tx.send(firing_alert("c1")).await.unwrap();
    drop(tx);

    let err = processor.process(rx).await.unwrap_err();

    assert_eq!(err.alert_id(), "b1");
    assert_eq!(storage.writes(), vec!["a1".to_string()]);
}

#[tokio::test]
async fn test_process_summarizes_outcomes() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let processor = recording_processor(&storage, &stream, fast_options(0));

    let (tx, rx) = mpsc::channel(8);
    for alert in [
        firing_alert("a1"),
        firing_alert("a1"),
        resolved_alert("b1", 1),
        resolved_alert("a1", 2),
        firing_alert("a1"),
    ] {
        tx.send(alert).await.unwrap();
    }
    drop(tx);

    let summary = processor.process(rx).await.unwrap();

    assert_eq!(summary.processed, 5);
    assert_eq!(summary.stored_new, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.rejected_resolved_new, 1);
    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.fired, 1);
}

#[tokio::test]
async fn test_mirroring_can_be_disabled() {
    let storage = RecordingStorage::new();
    let stream = RecordingStream::new();
    let options = ProcessorOptions { mirror_to_store_topic: false, ..fast_options(0) };
    let processor = recording_processor(&storage, &stream, options);

    processor.reconcile(firing_alert("a1")).await.unwrap();
    processor.reconcile(resolved_alert("a1", 5)).await.unwrap();

    assert_eq!(storage.write_count(), 2);
    assert!(stream.published_on(&topics().store).is_empty());
}
