//! Input sources for contact sensor levels.
//!
//! Current input sources:
//! - `gpio`: GPIO lines on the local board
//! - `simulation`: synthetic transitions when no hardware is present

pub mod gpio;
pub mod simulation;

pub use simulation::SensorSimulator;
