//! Outbound MQTT publishing.
//!
//! [`Publisher`] builds the per-sensor topic and hands status strings to a
//! [`Transport`]; [`MqttTransport`] is the rumqttc implementation.

mod client;
mod publisher;
mod transport;

pub use client::{MqttTransport, qos_for};
pub use publisher::{Publisher, TOPIC_PREFIX};
pub use transport::Transport;
