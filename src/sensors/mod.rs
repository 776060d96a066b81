//! Contact sensor state.
//!
//! The [`SensorRegistry`] names the configured lines, [`SensorMonitor`] turns
//! sampled levels into debounced [`Event`]s.

pub mod event;
pub mod monitor;
pub mod registry;

pub use event::{Event, Status};
pub use monitor::{DEBOUNCE, SensorMonitor, Transition};
pub use registry::SensorRegistry;
