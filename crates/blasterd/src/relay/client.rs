use std::time::Duration;

use async_trait::async_trait;
use rumqttc::AsyncClient;
use rumqttc::Event;
use rumqttc::EventLoop;
use rumqttc::MqttOptions;
use rumqttc::Packet;
use rumqttc::QoS;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::RelayError;
use crate::settings::RelaySettings;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CAPACITY: usize = 10;
const INCOMING_CAPACITY: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// A publish seen on the intent topic.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Broker side of the relay. Swapped for a queue in tests.
#[async_trait]
pub trait MqttClient: Send {
    async fn connect(&mut self) -> Result<(), RelayError>;

    async fn subscribe(&mut self, topic: &str) -> Result<(), RelayError>;

    /// Next intent payload, or None once the connection is gone for good.
    async fn poll_message(&mut self) -> Option<MqttMessage>;
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockMqttClient {
    pub messages: std::collections::VecDeque<MqttMessage>,
    pub subscriptions: Vec<String>,
    pub is_connected: bool,
}

#[cfg(test)]
impl MockMqttClient {
    pub fn add_message(&mut self, topic: &str, payload: &[u8]) {
        self.messages.push_back(MqttMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
    }
}

#[cfg(test)]
#[async_trait]
impl MqttClient for MockMqttClient {
    async fn connect(&mut self) -> Result<(), RelayError> {
        self.is_connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), RelayError> {
        if !self.is_connected {
            return Err(RelayError::NotConnected);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    /// Drained queue ends the relay loop.
    async fn poll_message(&mut self) -> Option<MqttMessage> {
        self.messages.pop_front()
    }
}

/// rumqttc connection. Nothing touches the network until `connect`.
pub struct RumqttcClient {
    options: MqttOptions,
    client: Option<AsyncClient>,
    incoming: Option<mpsc::Receiver<MqttMessage>>,
    pump: Option<JoinHandle<()>>,
}

impl RumqttcClient {
    pub fn new(settings: &RelaySettings) -> Self {
        let mut options =
            MqttOptions::new(settings.client_id.clone(), settings.broker.clone(), settings.port);
        options.set_keep_alive(KEEP_ALIVE);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            options.set_credentials(username, password);
        }

        Self {
            options,
            client: None,
            incoming: None,
            pump: None,
        }
    }
}

/// Drive the rumqttc event loop, handing publishes to the relay. rumqttc
/// reconnects on the next poll after an error.
async fn pump_events(mut event_loop: EventLoop, incoming: mpsc::Sender<MqttMessage>) {
    loop {
        let publish = match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => publish,
            Ok(event) => {
                debug!("MQTT event: {:?}", event);
                continue;
            }
            Err(e) => {
                warn!("MQTT connection to broker failed: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        let message = MqttMessage {
            topic: publish.topic.clone(),
            payload: publish.payload.to_vec(),
        };
        if incoming.send(message).await.is_err() {
            break;
        }
    }
    info!("Relay stopped reading from MQTT");
}

#[async_trait]
impl MqttClient for RumqttcClient {
    async fn connect(&mut self) -> Result<(), RelayError> {
        let (client, event_loop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        let (tx, rx) = mpsc::channel(INCOMING_CAPACITY);

        self.pump = Some(tokio::spawn(pump_events(event_loop, tx)));
        self.client = Some(client);
        self.incoming = Some(rx);
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), RelayError> {
        let Some(client) = &self.client else {
            return Err(RelayError::NotConnected);
        };

        client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| RelayError::Mqtt(e.to_string()))
    }

    async fn poll_message(&mut self) -> Option<MqttMessage> {
        self.incoming.as_mut()?.recv().await
    }
}

impl Drop for RumqttcClient {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rumqttc_client_needs_connect() {
        let mut client = RumqttcClient::new(&RelaySettings::default());

        assert!(matches!(
            client.subscribe("blasterd/intents").await,
            Err(RelayError::NotConnected)
        ));
        assert!(client.poll_message().await.is_none());
    }
}
