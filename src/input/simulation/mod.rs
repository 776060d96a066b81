//! Synthetic sensor traffic for boards without GPIO hardware.

mod sensors;

pub use sensors::SensorSimulator;
