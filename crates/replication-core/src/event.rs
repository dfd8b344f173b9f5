//! Per-message lifecycle events.
//!
//! Every status change of a message (stored, sent, received, handled) is
//! reported to a [`MessageEventSink`]. The sink decides what the events mean:
//! the daemon logs them, tests record them, an audit store could index them
//! using the query keys defined here.

use crate::{CustomMetadata, MessageId, ReceiverMessage, ReplicationInstance, SenderMessage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use tracing::info;

/// Application indicated on every replication message event.
pub const VALUE_APPLICATION: &str = "replication.message";

/// Status of the message.
pub const KEY_STATUS: &str = "status";
/// Message stored and waiting to be sent to the target instances.
pub const VALUE_STATUS_STORED: &str = "stored";
/// Message successfully sent to an instance.
pub const VALUE_STATUS_SENT: &str = "sent";
/// Message received from another instance and waiting to be handled.
pub const VALUE_STATUS_RECEIVED: &str = "received";
/// Received message successfully handled.
pub const VALUE_STATUS_HANDLED: &str = "handled";

/// Instance the message was sent to.
pub const KEY_TARGET: &str = "target";
pub const KEY_ID: &str = "id";
pub const KEY_DATE: &str = "date";
/// Instance the message originally comes from.
pub const KEY_SOURCE: &str = "source";
/// Last instance which sent the message (received messages only).
pub const KEY_SENDER: &str = "sender";
/// Instances which should handle the message.
pub const KEY_RECEIVERS: &str = "receivers";
pub const KEY_TYPE: &str = "type";

/// Prefix of custom message metadata fields.
pub const PREFIX_CUSTOM_METADATA: &str = "custom_";

/// Event field name of a custom message metadata key.
pub fn custom_metadata_name(key: &str) -> String {
    format!("{}{}", PREFIX_CUSTOM_METADATA, key)
}

/// Event type of a replication message type.
pub fn message_type_value(message_type: &str) -> String {
    format!("replication_message_{}", message_type)
}

/// Lifecycle status of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Stored,
    Sent,
    Received,
    Handled,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Stored => VALUE_STATUS_STORED,
            MessageStatus::Sent => VALUE_STATUS_SENT,
            MessageStatus::Received => VALUE_STATUS_RECEIVED,
            MessageStatus::Handled => VALUE_STATUS_HANDLED,
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status change of one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub status: MessageStatus,
    pub id: MessageId,
    pub date: DateTime<Utc>,
    pub source: Option<String>,
    pub sender: Option<String>,
    pub receivers: BTreeSet<String>,
    pub target: Option<String>,
    pub message_type: String,
    pub custom_metadata: CustomMetadata,
}

impl MessageEvent {
    /// Event for an outbound message, optionally scoped to one target.
    pub fn outbound(
        status: MessageStatus,
        message: &SenderMessage,
        target: Option<&ReplicationInstance>,
    ) -> Self {
        Self {
            status,
            id: message.id.clone(),
            date: message.date,
            source: message.source.clone(),
            sender: None,
            receivers: message.receivers.clone(),
            target: target.map(|t| t.uri.clone()),
            message_type: message.message_type.clone(),
            custom_metadata: message.custom_metadata.clone(),
        }
    }

    /// Event for an inbound message.
    pub fn inbound(status: MessageStatus, message: &ReceiverMessage) -> Self {
        Self {
            status,
            id: message.id.clone(),
            date: message.date,
            source: message.source.clone(),
            sender: Some(message.sender.clone()),
            receivers: message.receivers.clone(),
            target: None,
            message_type: message.message_type.clone(),
            custom_metadata: message.custom_metadata.clone(),
        }
    }

    /// Flattens the event into the audit key space.
    pub fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("application".to_string(), json!(VALUE_APPLICATION));
        fields.insert(
            "event_type".to_string(),
            json!(message_type_value(&self.message_type)),
        );
        fields.insert(KEY_STATUS.to_string(), json!(self.status.as_str()));
        fields.insert(KEY_ID.to_string(), json!(self.id.as_str()));
        fields.insert(KEY_DATE.to_string(), json!(self.date.to_rfc3339()));
        fields.insert(KEY_TYPE.to_string(), json!(self.message_type));
        if let Some(source) = &self.source {
            fields.insert(KEY_SOURCE.to_string(), json!(source));
        }
        if let Some(sender) = &self.sender {
            fields.insert(KEY_SENDER.to_string(), json!(sender));
        }
        if !self.receivers.is_empty() {
            fields.insert(KEY_RECEIVERS.to_string(), json!(self.receivers));
        }
        if let Some(target) = &self.target {
            fields.insert(KEY_TARGET.to_string(), json!(target));
        }
        for (key, values) in &self.custom_metadata {
            fields.insert(custom_metadata_name(key), json!(values));
        }
        fields
    }
}

/// A sink that receives message events.
pub trait MessageEventSink: Send + Sync {
    fn emit(&self, event: MessageEvent);
}

/// A no-op sink that discards all events.
#[derive(Debug, Default)]
pub struct NullSink;

impl MessageEventSink for NullSink {
    fn emit(&self, _event: MessageEvent) {}
}

/// Logs every event as a structured `tracing` record.
#[derive(Debug, Default)]
pub struct TracingSink;

impl MessageEventSink for TracingSink {
    fn emit(&self, event: MessageEvent) {
        let fields = Value::Object(event.fields());
        info!(
            status = %event.status,
            message_id = %event.id,
            message_type = %event.message_type,
            target = event.target.as_deref().unwrap_or(""),
            sender = event.sender.as_deref().unwrap_or(""),
            fields = %fields,
            "Replication message event"
        );
    }
}

/// A sink that records all events for testing.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<MessageEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    pub fn events(&self) -> Vec<MessageEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }

    /// Returns the recorded events with the given status.
    pub fn with_status(&self, status: MessageStatus) -> Vec<MessageEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.status == status)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageEventSink for RecordingSink {
    fn emit(&self, event: MessageEvent) {
        self.events.lock().expect("lock poisoned").push(event);
    }
}
