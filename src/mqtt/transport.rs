use crate::error::Result;
use async_trait::async_trait;

/// Publish-only broker connection.
///
/// `priority` is the MQTT quality of service level (0, 1 or 2).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self) -> Result<()>;

    /// Must be a no-op when `connect` never succeeded.
    async fn disconnect(&self) -> Result<()>;

    async fn send(&self, topic: &str, payload: &str, priority: u8) -> Result<()>;
}
