//! Reload of stored records on startup.

use super::harness::*;
use crate::{ReplicationSender, ShutdownOutcome};
use replication_core::{MessageId, MessageStatus, RecordingSink, StaticInstanceRegistry};
use replication_message_store::{MessageStore, SqliteMessageStore};
use std::sync::Arc;

#[tokio::test]
async fn test_reload_sends_to_stored_targets_only() {
    let store = RecordingStore::new();
    store
        .inner()
        .write_record(&message("m1"), &[instance_a()])
        .unwrap();

    let fixture = Fixture::start_with(
        test_config(),
        store,
        MockTransport::new(),
        vec![instance_a(), instance_b()],
    )
    .await;

    eventually(|| fixture.store.stored() == 0).await;
    assert_eq!(
        fixture.transport.delivered(),
        vec![(MessageId::from_string("m1"), instance_a().uri)]
    );
    // Nothing is written again on reload.
    assert!(fixture.store.writes().is_empty());
}

#[tokio::test]
async fn test_reloaded_records_go_before_new_submissions() {
    let store = RecordingStore::new();
    store
        .inner()
        .write_record(&message("old-1"), &[instance_a()])
        .unwrap();
    store
        .inner()
        .write_record(&message("old-2"), &[instance_a()])
        .unwrap();

    let fixture =
        Fixture::start_with(test_config(), store, MockTransport::new(), vec![instance_a()]).await;
    fixture.sender.enqueue(message("new")).await.unwrap();

    eventually(|| fixture.transport.delivered_count() == 3).await;
    assert_eq!(
        fixture.transport.delivered_to(&instance_a().uri),
        vec![
            MessageId::from_string("old-1"),
            MessageId::from_string("old-2"),
            MessageId::from_string("new"),
        ]
    );
}

#[tokio::test]
async fn test_undelivered_message_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("replication.db");
    let instances = vec![instance_a(), instance_b()];

    {
        let transport = MockTransport::new();
        transport.set_unreachable(&instance_a().uri, true);
        let store = RecordingStore::wrap(SqliteMessageStore::open(&path).unwrap(), true);
        let fixture =
            Fixture::start_with(test_config(), store, transport, instances.clone()).await;

        fixture.sender.enqueue(message("m1")).await.unwrap();
        eventually(|| fixture.transport.delivered_to(&instance_b().uri).len() == 1).await;
        eventually(|| fixture.transport.attempts_to(&instance_a().uri) >= 2).await;

        assert_eq!(fixture.sender.shutdown().await, ShutdownOutcome::Drained);
    }

    let store = Arc::new(SqliteMessageStore::open(&path).unwrap());
    let records = store.load_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].targets, vec![instance_a()]);
    assert_eq!(records[0].message.payload, b"payload".to_vec());

    let transport = Arc::new(MockTransport::new());
    let events = Arc::new(RecordingSink::new());
    let sender = ReplicationSender::start(
        test_config(),
        store.clone(),
        transport.clone(),
        Arc::new(StaticInstanceRegistry::new(instances)),
        events.clone(),
    )
    .await;

    eventually(|| store.count().unwrap() == 0).await;
    assert_eq!(
        transport.delivered(),
        vec![(MessageId::from_string("m1"), instance_a().uri)]
    );
    assert_eq!(events.with_status(MessageStatus::Sent).len(), 1);
    sender.shutdown().await;
}
