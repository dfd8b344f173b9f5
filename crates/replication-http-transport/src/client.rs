//! reqwest-backed transport.

use crate::WireMessage;
use async_trait::async_trait;
use replication_core::{ReplicationInstance, SenderMessage, Transport, TransportError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Path, relative to an instance URI, messages are posted to.
pub const MESSAGES_PATH: &str = "/replication/messages";

/// HTTP transport configuration.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// URI of the local instance, sent as the `sender` of every message.
    pub local_uri: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            local_uri: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Sends replication messages to peers over HTTP.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Endpoint messages for `target` are posted to.
    pub fn endpoint(target: &ReplicationInstance) -> String {
        format!("{}{}", target.uri.trim_end_matches('/'), MESSAGES_PATH)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_message(
        &self,
        message: &SenderMessage,
        target: &ReplicationInstance,
    ) -> Result<(), TransportError> {
        let url = Self::endpoint(target);
        let body = WireMessage::from_sender(message, &self.config.local_uri);

        debug!(
            url = %url,
            message_id = %message.id,
            message_type = %message.message_type,
            "Sending replication message"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
