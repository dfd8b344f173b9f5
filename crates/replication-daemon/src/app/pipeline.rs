//! Wiring of the sender pipeline from the daemon configuration.

use replication_config_and_utils::{Config, Paths, SenderSettings};
use replication_core::recover::TYPE_INSTANCE_RECOVER_REQUEST;
use replication_core::{ReceiverRegistry, StaticInstanceRegistry, TracingSink};
use replication_http_transport::{HttpTransport, HttpTransportConfig};
use replication_message_store::SqliteMessageStore;
use replication_recovery::{InstanceRecoverRequestReceiver, RecoverHandlerRegistry};
use replication_sender::{ReplicationSender, SenderConfig};
use std::sync::Arc;
use tracing::info;

/// A running sender, the store backing it and the inbound receivers.
pub struct Pipeline {
    pub sender: Arc<ReplicationSender>,
    pub store: Arc<SqliteMessageStore>,
    /// Inbound routing, ready for a message endpoint.
    pub receivers: ReceiverRegistry,
    /// Handlers run when a peer asks this instance for recovery.
    pub recover_handlers: Arc<RecoverHandlerRegistry>,
}

pub fn sender_config(settings: &SenderSettings) -> SenderConfig {
    SenderConfig {
        store_queue_capacity: settings.store_queue_capacity,
        send_queue_capacity: settings.send_queue_capacity,
        shutdown_timeout: settings.shutdown_timeout(),
        retry_delay: settings.retry_delay(),
    }
}

/// Opens the message store and starts the sender towards the configured peers.
pub async fn start_pipeline(
    config: &Config,
    paths: &Paths,
) -> Result<Pipeline, Box<dyn std::error::Error>> {
    paths.ensure_dirs()?;

    let store = Arc::new(SqliteMessageStore::open(&paths.database_file())?);
    let transport = HttpTransport::new(HttpTransportConfig {
        local_uri: config.instance.uri.clone(),
        timeout_secs: config.transport.timeout_secs,
    })?;
    let instances = StaticInstanceRegistry::new(config.peers.clone());

    info!(
        database = %paths.database_file().display(),
        peers = config.peers.len(),
        "Starting replication pipeline"
    );

    let sender = Arc::new(
        ReplicationSender::start(
            sender_config(&config.sender),
            store.clone(),
            Arc::new(transport),
            Arc::new(instances),
            Arc::new(TracingSink),
        )
        .await,
    );

    let recover_handlers = Arc::new(RecoverHandlerRegistry::new());
    let receivers = receiver_registry(recover_handlers.clone(), sender.clone());

    Ok(Pipeline {
        sender,
        store,
        receivers,
        recover_handlers,
    })
}

/// Inbound receivers, with recovery requests answered through `sender`.
pub fn receiver_registry(
    recover_handlers: Arc<RecoverHandlerRegistry>,
    sender: Arc<ReplicationSender>,
) -> ReceiverRegistry {
    let mut receivers = ReceiverRegistry::new(Arc::new(TracingSink));
    receivers.register(
        TYPE_INSTANCE_RECOVER_REQUEST,
        Arc::new(InstanceRecoverRequestReceiver::new(recover_handlers, sender)),
    );
    receivers
}
