//! # Replication Core
//!
//! Shared vocabulary of the instance replication pipeline.
//!
//! This crate provides:
//! - Message types: [`SenderMessage`] (outbound, immutable once queued) and
//!   [`ReceiverMessage`] (inbound, read-only to handlers)
//! - Peer identity: [`ReplicationInstance`] and the [`InstanceRegistry`] seam
//! - Collaborator traits: [`Transport`] (one network send attempt) and
//!   [`MessageSender`] (the intake of the delivery pipeline)
//! - Instance recovery message shapes ([`recover`])
//! - Per-message lifecycle events ([`event`]) for the audit trail
//! - Inbound dispatch by message type ([`ReceiverRegistry`])
//!
//! The delivery engine itself lives in `replication-sender`, durable storage
//! in `replication-message-store`.

mod error;
pub mod event;
mod instance;
mod message;
mod receiver;
pub mod recover;
mod transport;
mod types;

pub use error::{ReplicationError, ReplicationResult, TransportError};
pub use event::{MessageEvent, MessageEventSink, MessageStatus, NullSink, RecordingSink, TracingSink};
pub use instance::{InstanceRegistry, ReplicationInstance, StaticInstanceRegistry};
pub use message::{decode_date, encode_date, CustomMetadata, ReceiverMessage, SenderMessage};
pub use receiver::{MessageReceiver, ReceiverRegistry};
pub use transport::{MessageSender, Transport};
pub use types::MessageId;
