//! Pi alarm adapter library.
//!
//! Watches door/window contact sensors wired to GPIO lines and publishes
//! every debounced open/closed transition to an MQTT broker under
//! `alarm/<sensor>/status`. Boards without GPIO hardware run a simulator
//! that feeds the same publishing path.

pub mod config;
pub mod error;
pub mod input;
pub mod mqtt;
pub mod sensors;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AlarmError, Result};
