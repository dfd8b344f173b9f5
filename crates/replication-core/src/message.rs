//! Outbound and inbound replication messages.

use crate::{MessageId, ReplicationError, ReplicationResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Custom metadata: ordered mapping of key to a list of values.
pub type CustomMetadata = BTreeMap<String, Vec<String>>;

/// An outbound message.
///
/// Built once by the originator, then shared as `Arc<SenderMessage>` through
/// the pipeline. Nothing mutates it after it has been queued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderMessage {
    pub id: MessageId,
    pub date: DateTime<Utc>,
    /// Discriminator used by receivers to route the message.
    pub message_type: String,
    /// Instance the message originally comes from, set when relayed.
    pub source: Option<String>,
    /// Instances expected to handle the message. Empty means all.
    pub receivers: BTreeSet<String>,
    pub custom_metadata: CustomMetadata,
    /// Opaque body.
    pub payload: Vec<u8>,
}

impl SenderMessage {
    /// Creates a message of the given type with a fresh id and the current date.
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            date: Utc::now(),
            message_type: message_type.into(),
            source: None,
            receivers: BTreeSet::new(),
            custom_metadata: CustomMetadata::new(),
            payload: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_receivers<I, S>(mut self, receivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.receivers = receivers.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a value to a custom metadata key.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_metadata
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Appends a date value, encoded the same way [`ReceiverMessage::metadata_date`] reads it.
    pub fn with_metadata_date(self, key: impl Into<String>, date: DateTime<Utc>) -> Self {
        self.with_metadata(key, encode_date(date))
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Keeps identity, date and source of a received message so it can be relayed.
    pub fn relayed_from(mut self, message: &ReceiverMessage) -> Self {
        self.id = message.id.clone();
        self.date = message.date;
        self.source = message.source.clone();
        self
    }
}

/// An inbound message, as handed to receivers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverMessage {
    pub id: MessageId,
    pub date: DateTime<Utc>,
    pub message_type: String,
    /// Instance the message originally comes from.
    pub source: Option<String>,
    /// Last instance which sent the message.
    pub sender: String,
    pub receivers: BTreeSet<String>,
    pub custom_metadata: CustomMetadata,
    pub payload: Vec<u8>,
}

impl ReceiverMessage {
    /// The view a peer gets of `message` when `sender` delivers it.
    ///
    /// A message without a source is attributed to its sender.
    pub fn from_sender(message: &SenderMessage, sender: impl Into<String>) -> Self {
        let sender = sender.into();
        Self {
            id: message.id.clone(),
            date: message.date,
            message_type: message.message_type.clone(),
            source: Some(message.source.clone().unwrap_or_else(|| sender.clone())),
            sender,
            receivers: message.receivers.clone(),
            custom_metadata: message.custom_metadata.clone(),
            payload: message.payload.clone(),
        }
    }

    /// Returns the first value of a metadata key.
    ///
    /// Fails with `InvalidMessage` when `mandatory` is set and the key is absent.
    pub fn metadata_value(&self, key: &str, mandatory: bool) -> ReplicationResult<Option<&str>> {
        let value = self
            .custom_metadata
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str);

        match value {
            None if mandatory => Err(ReplicationError::InvalidMessage(format!(
                "Missing mandatory metadata [{}] in message [{}]",
                key, self.id
            ))),
            other => Ok(other),
        }
    }

    /// Returns the first value of a metadata key parsed as a date.
    pub fn metadata_date(
        &self,
        key: &str,
        mandatory: bool,
    ) -> ReplicationResult<Option<DateTime<Utc>>> {
        match self.metadata_value(key, mandatory)? {
            Some(raw) => decode_date(raw).map(Some).map_err(|e| {
                ReplicationError::InvalidMessage(format!(
                    "Invalid date [{}] for metadata [{}] in message [{}]: {}",
                    raw, key, self.id, e
                ))
            }),
            None => Ok(None),
        }
    }

    /// Whether `instance` is expected to handle this message.
    pub fn is_receiver(&self, instance: &str) -> bool {
        self.receivers.is_empty() || self.receivers.contains(instance)
    }
}

/// Encodes a date the way it travels in metadata (RFC 3339, millisecond precision).
pub fn encode_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a date encoded with [`encode_date`] (any RFC 3339 offset is accepted).
pub fn decode_date(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|d| d.with_timezone(&Utc))
}
