use std::path::PathBuf;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum AlarmError {
    #[error("GPIO hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Failed to acquire line {line_id}: {reason}")]
    LineAcquisitionFailed { line_id: u32, reason: String },

    #[error("Failed to read line {line_id}: {reason}")]
    LineReadFailed { line_id: u32, reason: String },

    #[error("No sensor configured for line {0}")]
    UnknownSensor(u32),

    #[error("Failed to deliver message to {topic}: {reason}")]
    DeliveryFailed { topic: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Configuration file {0} does not exist (run `pi-alarm-adapter init` to create one)")]
    ConfigNotFound(PathBuf),

    #[error("Line {line_id} is assigned to both '{first}' and '{second}'")]
    DuplicateLine {
        line_id: u32,
        first: String,
        second: String,
    },

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AlarmError>;
