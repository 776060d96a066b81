//! GPIO line acquisition.
//!
//! The monitor only needs to request a line as an input, sample its level and
//! release it again. Those three operations are expressed as the
//! [`LineProvider`] and [`LineHandle`] traits so the real character-device
//! backend and test fakes are interchangeable.

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod cdev;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use cdev::CdevLineProvider;

use crate::config::GpioConfig;
use crate::error::{AlarmError, Result};

/// Consumer label attached to every requested line.
pub const CONSUMER_NAME: &str = "pi-alarm-adapter";

/// Electrical bias applied to an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    PullUp,
    PullDown,
    Disabled,
}

/// An acquired input line.
pub trait LineHandle: Send {
    /// Sample the current level: `false` is low (contact closed), `true` is high (open).
    fn sample(&mut self) -> Result<bool>;

    /// Give the line back to the kernel. Further samples fail.
    fn release(&mut self);
}

/// Source of input lines.
pub trait LineProvider: Send {
    /// Request `line_id` as an input.
    ///
    /// Returns [`AlarmError::HardwareUnavailable`] when the whole GPIO subsystem
    /// is unusable, [`AlarmError::LineAcquisitionFailed`] when only this line is.
    fn acquire(&mut self, line_id: u32, consumer: &str, bias: Bias) -> Result<Box<dyn LineHandle>>;
}

/// Provider used when no GPIO backend is compiled in.
pub struct UnavailableLineProvider {
    reason: String,
}

impl UnavailableLineProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl LineProvider for UnavailableLineProvider {
    fn acquire(
        &mut self,
        _line_id: u32,
        _consumer: &str,
        _bias: Bias,
    ) -> Result<Box<dyn LineHandle>> {
        Err(AlarmError::HardwareUnavailable(self.reason.clone()))
    }
}

/// Pick the line backend for this build.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn line_provider(config: &GpioConfig) -> Box<dyn LineProvider> {
    Box::new(CdevLineProvider::new(config.chip.clone()))
}

/// Pick the line backend for this build.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn line_provider(config: &GpioConfig) -> Box<dyn LineProvider> {
    Box::new(UnavailableLineProvider::new(format!(
        "built without GPIO support, cannot open {}",
        config.chip.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_provider_reports_hardware_unavailable() {
        let mut provider = UnavailableLineProvider::new("no driver");
        let result = provider.acquire(17, CONSUMER_NAME, Bias::PullUp);
        assert!(matches!(
            result,
            Err(AlarmError::HardwareUnavailable(reason)) if reason == "no driver"
        ));
    }
}
