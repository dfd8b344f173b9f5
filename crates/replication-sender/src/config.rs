//! Sender pipeline configuration.

use std::time::Duration;

/// Default capacity of both the store queue and the send queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default time the persist stage is given to drain on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Sender pipeline configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Capacity of the intake (store) queue. Submitters wait when it is full.
    pub store_queue_capacity: usize,
    /// Capacity of the send queue.
    pub send_queue_capacity: usize,
    /// How long shutdown waits for the persist stage before cancelling it.
    pub shutdown_timeout: Duration,
    /// Delay before a failed delivery re-enters the send queue.
    ///
    /// Zero re-queues immediately. The number of attempts is never capped.
    pub retry_delay: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            store_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            send_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            retry_delay: Duration::from_secs(1),
        }
    }
}
