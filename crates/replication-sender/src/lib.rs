//! # Replication Sender
//!
//! Reliable delivery of outbound replication messages to peer instances.
//!
//! ## Architecture
//!
//! ```text
//! enqueue() ──▶ store queue ──▶ [persist stage] ──▶ send queue ──▶ [send stage] ──▶ Transport
//!  (bounded)                        │                   ▲              │
//!                                   ▼                   │  failure:    │ success:
//!                              MessageStore             └─ one target ─┘ remove_target
//!                               (SQLite)                   back at tail
//! ```
//!
//! - **Persist stage**: resolves "all instances" target sets, writes the
//!   message to the [`MessageStore`](replication_message_store::MessageStore)
//!   and forwards it with the stored targets. A storage failure is logged and
//!   the message is forwarded anyway.
//! - **Send stage**: sends to each target independently. A failing target is
//!   re-queued alone at the tail of the send queue, forever, so it never
//!   holds back other targets or other messages.
//! - **Startup reload**: records left in the store are queued for sending with
//!   their stored targets before the pipeline accepts new work.
//! - **Shutdown**: the persist stage drains within a bounded timeout; the send
//!   stage is stopped right away since its state is on disk.
//!
//! ## Example
//!
//! ```ignore
//! let sender = ReplicationSender::start(
//!     SenderConfig::default(),
//!     Arc::new(SqliteMessageStore::open(&path)?),
//!     Arc::new(HttpTransport::new(config)?),
//!     Arc::new(StaticInstanceRegistry::new(peers)),
//!     Arc::new(TracingSink),
//! )
//! .await;
//!
//! sender.enqueue(SenderMessage::new("document_update")).await?;
//! sender.shutdown().await;
//! ```

mod config;
mod persist;
mod pipeline;
mod queue;
mod send;

#[cfg(test)]
mod tests;

pub use config::{SenderConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};
pub use pipeline::{QueueStatus, ReplicationSender, ShutdownOutcome};
