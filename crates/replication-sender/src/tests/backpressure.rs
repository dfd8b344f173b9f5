//! Bounded intake.

use super::harness::*;
use crate::{QueueStatus, SenderConfig};
use replication_core::MessageId;
use std::time::Duration;

fn small_intake() -> SenderConfig {
    SenderConfig {
        store_queue_capacity: 2,
        ..test_config()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_enqueue_waits_while_store_queue_is_full() {
    let fixture = Fixture::start_with(
        small_intake(),
        RecordingStore::gated(),
        MockTransport::new(),
        vec![instance_a()],
    )
    .await;

    // m1 is held by the persist stage, m2 and m3 fill the queue.
    within(fixture.sender.enqueue(message("m1"))).await.unwrap();
    eventually(|| fixture.store.write_attempts() == 1).await;
    within(fixture.sender.enqueue(message("m2"))).await.unwrap();
    within(fixture.sender.enqueue(message("m3"))).await.unwrap();

    assert_eq!(
        fixture.sender.queue_status(),
        QueueStatus {
            store_pending: 2,
            send_pending: 0,
        }
    );

    let blocked =
        tokio::time::timeout(Duration::from_millis(100), fixture.sender.enqueue(message("m4")))
            .await;
    assert!(blocked.is_err(), "enqueue should wait for room");

    fixture.store.release();
    within(fixture.sender.enqueue(message("m5"))).await.unwrap();

    eventually(|| fixture.transport.delivered_count() == 4).await;
    assert_eq!(
        fixture.transport.delivered_to(&instance_a().uri),
        vec![
            MessageId::from_string("m1"),
            MessageId::from_string("m2"),
            MessageId::from_string("m3"),
            MessageId::from_string("m5"),
        ]
    );
}

#[tokio::test]
async fn test_queue_status_is_empty_when_idle() {
    let fixture = Fixture::start(vec![instance_a()]).await;

    fixture.sender.enqueue(message("m1")).await.unwrap();
    eventually(|| fixture.store.stored() == 0 && fixture.transport.delivered_count() == 1).await;

    assert_eq!(
        fixture.sender.queue_status(),
        QueueStatus {
            store_pending: 0,
            send_pending: 0,
        }
    );
}

#[tokio::test]
async fn test_zero_capacity_is_treated_as_one() {
    let config = SenderConfig {
        store_queue_capacity: 0,
        send_queue_capacity: 0,
        ..test_config()
    };
    let fixture =
        Fixture::start_with(config, RecordingStore::new(), MockTransport::new(), vec![instance_a()])
            .await;

    for id in ["m1", "m2", "m3"] {
        within(fixture.sender.enqueue(message(id))).await.unwrap();
    }
    eventually(|| fixture.transport.delivered_count() == 3).await;
}
