//! MQTT → HTTP intent relay.
//!
//! Voice-assistant requests published on an MQTT topic are forwarded as-is
//! to the API server's intent endpoint.

mod client;

pub use client::MqttClient;
pub use client::MqttMessage;
pub use client::RumqttcClient;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::settings::RelaySettings;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("MQTT client not connected")]
    NotConnected,

    #[error("MQTT error: {0}")]
    Mqtt(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct IntentRelay<C: MqttClient> {
    client: C,
    http: reqwest::Client,
    settings: RelaySettings,
}

impl<C: MqttClient> IntentRelay<C> {
    pub fn new(client: C, settings: RelaySettings) -> Self {
        Self {
            client,
            http: reqwest::Client::new(),
            settings,
        }
    }

    /// Forward messages until the client stops or shutdown is signalled.
    ///
    /// A message that cannot be delivered is logged and dropped.
    pub async fn run(
        &mut self,
        mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> Result<(), RelayError> {
        self.client.connect().await?;
        self.client.subscribe(&self.settings.topic).await?;
        info!(
            "Relaying intents from {} to {}",
            self.settings.topic, self.settings.endpoint
        );

        loop {
            let msg = tokio::select! {
                msg = self.client.poll_message() => msg,
                _ = &mut shutdown_rx => {
                    info!("Intent relay shutting down");
                    break;
                }
            };

            let Some(msg) = msg else {
                info!("MQTT client stopped, intent relay exiting");
                break;
            };

            match self.forward(&msg.payload).await {
                Ok(status) if status.is_success() => {
                    debug!("Relayed intent from {} ({})", msg.topic, status)
                }
                Ok(status) => warn!("Intent from {} rejected with {}", msg.topic, status),
                Err(e) => warn!("Failed to relay intent from {}: {}", msg.topic, e),
            }
        }

        Ok(())
    }

    /// POST one payload to the intent endpoint.
    pub async fn forward(&self, payload: &[u8]) -> Result<StatusCode, RelayError> {
        let mut request = self
            .http
            .post(&self.settings.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec());

        if let Some(token) = self.settings.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        Ok(request.send().await?.status())
    }
}
