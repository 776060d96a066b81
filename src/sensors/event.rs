//! Sensor transition events.

use serde::Serialize;
use std::fmt;

/// Contact state reported to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Closed,
}

impl Status {
    /// Derive the status from a sampled level: low (contact pulled to ground) is closed.
    pub fn from_level(level: bool) -> Self {
        if level { Status::Open } else { Status::Closed }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Closed => "closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted sensor transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    status: Status,
    line_id: u32,
    name: String,
    priority: u8,
}

impl Event {
    pub const DEFAULT_PRIORITY: u8 = 0;
    /// Priority used for real and simulated transitions alike.
    pub const AUTHORITATIVE_PRIORITY: u8 = 2;

    /// Create an event with the default priority.
    pub fn new(status: Status, line_id: u32, name: impl Into<String>) -> Self {
        Self {
            status,
            line_id,
            name: name.into(),
            priority: Self::DEFAULT_PRIORITY,
        }
    }

    /// Set the delivery priority (MQTT QoS level).
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Contact state after the transition.
    pub fn status(&self) -> Status {
        self.status
    }

    /// GPIO line the transition was seen on.
    pub fn line_id(&self) -> u32 {
        self.line_id
    }

    /// Sensor name, also the topic segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivery priority (MQTT QoS level).
    pub fn priority(&self) -> u8 {
        self.priority
    }
}
