//! Test doubles and fixtures shared by the pipeline tests.

use crate::{ReplicationSender, SenderConfig};
use async_trait::async_trait;
use replication_core::{
    MessageId, RecordingSink, ReplicationInstance, SenderMessage, StaticInstanceRegistry,
    Transport, TransportError,
};
use replication_message_store::{
    MessageStore, SqliteMessageStore, StoreError, StoreResult, StoredMessageRecord,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

pub fn instance_a() -> ReplicationInstance {
    ReplicationInstance::new("a", "http://a.local")
}

pub fn instance_b() -> ReplicationInstance {
    ReplicationInstance::new("b", "http://b.local")
}

pub fn instance_c() -> ReplicationInstance {
    ReplicationInstance::new("c", "http://c.local")
}

pub fn message(id: &str) -> SenderMessage {
    SenderMessage::new("document_update")
        .with_id(MessageId::from_string(id))
        .with_payload(b"payload".to_vec())
}

/// Config with immediate retries and a short shutdown timeout.
pub fn test_config() -> SenderConfig {
    SenderConfig {
        store_queue_capacity: 100,
        send_queue_capacity: 100,
        shutdown_timeout: Duration::from_secs(5),
        retry_delay: Duration::ZERO,
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub async fn eventually(condition: impl FnMut() -> bool) {
    assert!(
        wait_until(Duration::from_secs(5), condition).await,
        "condition not met in time"
    );
}

/// Awaits `future`, failing the test if it does not complete in time.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("operation did not complete in time")
}

// ============================================================================
// Transport
// ============================================================================

/// Transport that records attempts and fails on demand, per target URI.
#[derive(Default)]
pub struct MockTransport {
    /// Number of upcoming attempts that fail, per URI.
    failures: Mutex<HashMap<String, usize>>,
    /// URIs that always fail.
    unreachable: Mutex<HashSet<String>>,
    attempts: Mutex<Vec<(MessageId, String)>>,
    delivered: Mutex<Vec<(MessageId, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, uri: &str, count: usize) {
        self.failures
            .lock()
            .unwrap()
            .insert(uri.to_string(), count);
    }

    pub fn set_unreachable(&self, uri: &str, unreachable: bool) {
        let mut set = self.unreachable.lock().unwrap();
        if unreachable {
            set.insert(uri.to_string());
        } else {
            set.remove(uri);
        }
    }

    pub fn attempts_to(&self, uri: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, u)| u == uri)
            .count()
    }

    pub fn delivered(&self) -> Vec<(MessageId, String)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn delivered_to(&self, uri: &str) -> Vec<MessageId> {
        self.delivered()
            .into_iter()
            .filter(|(_, u)| u == uri)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_message(
        &self,
        message: &SenderMessage,
        target: &ReplicationInstance,
    ) -> Result<(), TransportError> {
        self.attempts
            .lock()
            .unwrap()
            .push((message.id.clone(), target.uri.clone()));

        if self.unreachable.lock().unwrap().contains(&target.uri) {
            return Err(TransportError::Http("connection refused".to_string()));
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&target.uri) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(TransportError::Rejected {
                        status: 503,
                        body: "unavailable".to_string(),
                    });
                }
            }
        }

        self.delivered
            .lock()
            .unwrap()
            .push((message.id.clone(), target.uri.clone()));
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    Write(MessageId, Vec<String>),
    Remove(MessageId, String),
}

/// Blocks store writes until released.
struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            changed: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.changed.wait(open).unwrap();
        }
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }
}

/// SQLite store that records calls and can fail or block on demand.
pub struct RecordingStore {
    inner: SqliteMessageStore,
    calls: Mutex<Vec<StoreCall>>,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
    write_attempts: AtomicUsize,
    gate: Gate,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::wrap(SqliteMessageStore::open_in_memory().unwrap(), true)
    }

    /// Store whose writes block until [`RecordingStore::release`] is called.
    pub fn gated() -> Self {
        Self::wrap(SqliteMessageStore::open_in_memory().unwrap(), false)
    }

    pub fn wrap(inner: SqliteMessageStore, open: bool) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
            write_attempts: AtomicUsize::new(0),
            gate: Gate::new(open),
        }
    }

    pub fn inner(&self) -> &SqliteMessageStore {
        &self.inner
    }

    pub fn release(&self) {
        self.gate.release();
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, StoreCall::Write(..)))
            .collect()
    }

    pub fn stored(&self) -> usize {
        self.inner.count().unwrap()
    }
}

impl MessageStore for RecordingStore {
    fn write_record(
        &self,
        message: &SenderMessage,
        targets: &[ReplicationInstance],
    ) -> StoreResult<StoredMessageRecord> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        self.gate.wait();

        self.calls.lock().unwrap().push(StoreCall::Write(
            message.id.clone(),
            targets.iter().map(|t| t.uri.clone()).collect(),
        ));

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("disk full".to_string()));
        }
        self.inner.write_record(message, targets)
    }

    fn load_all(&self) -> StoreResult<Vec<StoredMessageRecord>> {
        self.inner.load_all()
    }

    fn remove_target(&self, message_id: &MessageId, target: &ReplicationInstance) -> StoreResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Remove(message_id.clone(), target.uri.clone()));

        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("read-only".to_string()));
        }
        self.inner.remove_target(message_id, target)
    }

    fn count(&self) -> StoreResult<usize> {
        self.inner.count()
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub struct Fixture {
    pub sender: ReplicationSender,
    pub store: Arc<RecordingStore>,
    pub transport: Arc<MockTransport>,
    pub instances: Arc<StaticInstanceRegistry>,
    pub events: Arc<RecordingSink>,
}

impl Fixture {
    pub async fn start(instances: Vec<ReplicationInstance>) -> Self {
        Self::start_with(test_config(), RecordingStore::new(), MockTransport::new(), instances)
            .await
    }

    pub async fn start_with(
        config: SenderConfig,
        store: RecordingStore,
        transport: MockTransport,
        instances: Vec<ReplicationInstance>,
    ) -> Self {
        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let instances = Arc::new(StaticInstanceRegistry::new(instances));
        let events = Arc::new(RecordingSink::new());

        let sender = ReplicationSender::start(
            config,
            store.clone(),
            transport.clone(),
            instances.clone(),
            events.clone(),
        )
        .await;

        Self {
            sender,
            store,
            transport,
            instances,
            events,
        }
    }
}
