//! Turns sensor events into broker publishes.

use super::transport::Transport;
use crate::error::{AlarmError, Result};
use crate::sensors::Event;
use log::{Level, debug, log_enabled};
use std::sync::Arc;
use tokio::sync::Mutex;

/// First topic segment for every sensor.
pub const TOPIC_PREFIX: &str = "alarm";

/// Shared by the monitor and the simulator.
///
/// Sends are serialized so the poll path and the simulation task never
/// interleave on the transport.
pub struct Publisher {
    transport: Arc<dyn Transport>,
    send_lock: Mutex<()>,
}

impl Publisher {
    /// Wrap a transport. Nothing is sent until [`Publisher::connect`].
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            send_lock: Mutex::new(()),
        }
    }

    /// `alarm/<name>/status`
    pub fn topic_for(name: &str) -> String {
        format!("{}/{}/status", TOPIC_PREFIX, name)
    }

    /// Open the broker connection.
    pub async fn connect(&self) -> Result<()> {
        self.transport.connect().await
    }

    /// Close the broker connection. Safe without a prior successful `connect`.
    pub async fn disconnect(&self) -> Result<()> {
        self.transport.disconnect().await
    }

    /// Publish one event. No retry: a failure means this event is lost.
    pub async fn publish(&self, event: &Event) -> Result<()> {
        if log_enabled!(Level::Debug) {
            match serde_json::to_string(event) {
                Ok(json) => debug!("[MQTT] Message request: {}", json),
                Err(_) => debug!("[MQTT] Message request: {:?}", event),
            }
        }

        let topic = Self::topic_for(event.name());
        let _guard = self.send_lock.lock().await;
        self.transport
            .send(&topic, event.status().as_str(), event.priority())
            .await
            .map_err(|e| match e {
                delivery @ AlarmError::DeliveryFailed { .. } => delivery,
                other => AlarmError::DeliveryFailed {
                    topic: topic.clone(),
                    reason: other.to_string(),
                },
            })
    }
}
