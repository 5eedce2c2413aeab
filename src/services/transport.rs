//! Outbound message transport
//!
//! The engine only needs `send(message) -> delivered | failed`; the actual
//! SMS/email protocol lives behind a gateway webhook. Tests substitute a
//! recording implementation of the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::settings::NotificationConfig;
use crate::models::NotificationChannel;
use crate::utils::errors::{OpsError, Result};

/// One rendered message bound for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: NotificationChannel,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<()>;
}

/// Production transport: POSTs each message to the configured gateway.
#[derive(Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
    gateway_url: String,
}

impl WebhookTransport {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.send_timeout_seconds))
            .build()
            .map_err(|e| OpsError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
        })
    }
}

#[async_trait]
impl MessageTransport for WebhookTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        debug!(channel = %message.channel, "Posting message to gateway");

        let response = self
            .client
            .post(&self.gateway_url)
            .json(message)
            .send()
            .await
            .map_err(|e| OpsError::Transport(format!("gateway request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OpsError::Transport(format!(
                "gateway returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
