//! JSON body exchanged between instances.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use replication_core::{
    decode_date, encode_date, CustomMetadata, MessageId, ReceiverMessage, ReplicationError,
    ReplicationResult, SenderMessage,
};
use serde::{Deserialize, Serialize};

/// A message as it travels over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: String,
    /// RFC 3339, millisecond precision.
    pub date: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// URI of the instance performing this hop.
    pub sender: String,
    #[serde(default)]
    pub receivers: Vec<String>,
    #[serde(default)]
    pub custom_metadata: CustomMetadata,
    /// Base64 (standard alphabet) of the payload bytes.
    #[serde(default)]
    pub payload: String,
}

impl WireMessage {
    pub fn from_sender(message: &SenderMessage, sender: &str) -> Self {
        Self {
            id: message.id.to_string(),
            date: encode_date(message.date),
            message_type: message.message_type.clone(),
            source: message.source.clone(),
            sender: sender.to_string(),
            receivers: message.receivers.iter().cloned().collect(),
            custom_metadata: message.custom_metadata.clone(),
            payload: STANDARD.encode(&message.payload),
        }
    }

    /// Decodes an inbound body.
    ///
    /// A missing source is attributed to the sender.
    pub fn into_receiver_message(self) -> ReplicationResult<ReceiverMessage> {
        let date = decode_date(&self.date).map_err(|e| {
            ReplicationError::InvalidMessage(format!(
                "Invalid date [{}] in message [{}]: {}",
                self.date, self.id, e
            ))
        })?;
        let payload = STANDARD.decode(self.payload.as_bytes()).map_err(|e| {
            ReplicationError::InvalidMessage(format!(
                "Invalid payload in message [{}]: {}",
                self.id, e
            ))
        })?;

        Ok(ReceiverMessage {
            id: MessageId::from_string(self.id),
            date,
            message_type: self.message_type,
            source: Some(self.source.unwrap_or_else(|| self.sender.clone())),
            sender: self.sender,
            receivers: self.receivers.into_iter().collect(),
            custom_metadata: self.custom_metadata,
            payload,
        })
    }
}
