//! rumqttc-backed transport for the alarm broker.

use super::transport::Transport;
use crate::config::MqttConfig;
use crate::error::{AlarmError, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event as MqttEvent, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

struct Session {
    client: AsyncClient,
    event_loop: JoinHandle<()>,
}

/// MQTT transport.
///
/// The event loop runs on its own task from `connect` until `disconnect`;
/// rumqttc reconnects on its own when polled after a connection error.
pub struct MqttTransport {
    config: MqttConfig,
    session: Mutex<Option<Session>>,
}

impl MqttTransport {
    /// Create a disconnected transport for `config`'s broker.
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            &self.config.client_id,
            &self.config.broker_host,
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));

        // Set credentials if provided
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            options.set_credentials(username, password);
        }
        options
    }

    fn client(&self) -> Option<AsyncClient> {
        self.session.lock().as_ref().map(|s| s.client.clone())
    }
}

/// Map a message priority to an MQTT QoS level.
pub fn qos_for(priority: u8) -> Option<QoS> {
    match priority {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

async fn run_event_loop(mut event_loop: EventLoop, mut connected: Option<oneshot::Sender<()>>) {
    loop {
        match event_loop.poll().await {
            Ok(MqttEvent::Incoming(Packet::ConnAck(ack))) => {
                info!("[MQTT] Connected to broker ({:?})", ack.code);
                if let Some(tx) = connected.take() {
                    let _ = tx.send(());
                }
            }
            Ok(MqttEvent::Outgoing(Outgoing::Disconnect)) => {
                debug!("[MQTT] Disconnect sent, stopping event loop");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("[MQTT] Connection error: {:?}", e);
                // Wait before reconnecting
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&self) -> Result<()> {
        if self.session.lock().is_some() {
            return Ok(());
        }

        info!(
            "[MQTT] Attempting to connect to {}:{}",
            self.config.broker_host, self.config.broker_port
        );

        let (client, event_loop) = AsyncClient::new(self.options(), 100);
        let (connected_tx, connected_rx) = oneshot::channel();
        let event_loop = tokio::spawn(run_event_loop(event_loop, Some(connected_tx)));

        match tokio::time::timeout(CONNECT_TIMEOUT, connected_rx).await {
            Ok(Ok(())) => {
                *self.session.lock() = Some(Session { client, event_loop });
                Ok(())
            }
            Ok(Err(_)) => {
                event_loop.abort();
                Err(AlarmError::Transport(
                    "event loop stopped before connecting".to_string(),
                ))
            }
            Err(_) => {
                event_loop.abort();
                Err(AlarmError::Transport(format!(
                    "no answer from {}:{} after {} seconds",
                    self.config.broker_host,
                    self.config.broker_port,
                    CONNECT_TIMEOUT.as_secs()
                )))
            }
        }
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(session) = self.session.lock().take() else {
            debug!("[MQTT] Not connected, nothing to disconnect");
            return Ok(());
        };

        info!(
            "[MQTT] Disconnecting from {}:{}",
            self.config.broker_host, self.config.broker_port
        );

        let Session {
            client,
            mut event_loop,
        } = session;

        if let Err(e) = client.disconnect().await {
            event_loop.abort();
            return Err(AlarmError::Transport(e.to_string()));
        }

        if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut event_loop)
            .await
            .is_err()
        {
            warn!("[MQTT] Event loop did not stop after disconnect, aborting it");
            event_loop.abort();
        }
        Ok(())
    }

    async fn send(&self, topic: &str, payload: &str, priority: u8) -> Result<()> {
        let qos = qos_for(priority).ok_or_else(|| AlarmError::DeliveryFailed {
            topic: topic.to_string(),
            reason: format!("unsupported priority {}", priority),
        })?;
        let client = self.client().ok_or_else(|| AlarmError::DeliveryFailed {
            topic: topic.to_string(),
            reason: "not connected".to_string(),
        })?;

        client
            .publish(topic, qos, false, payload.as_bytes())
            .await
            .map_err(|e| AlarmError::DeliveryFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        debug!("[MQTT] Sent message: {} to topic: {}", payload, topic);
        Ok(())
    }
}
