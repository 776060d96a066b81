//! GPIO lines via the Linux character device (`/dev/gpiochipN`).

use super::{Bias, LineHandle, LineProvider};
use crate::error::{AlarmError, Result};
use gpiocdev::Request;
use gpiocdev::line::{Bias as CdevBias, Value};
use log::debug;
use std::fs::File;
use std::path::PathBuf;

pub struct CdevLineProvider {
    chip: PathBuf,
}

impl CdevLineProvider {
    pub fn new(chip: impl Into<PathBuf>) -> Self {
        Self { chip: chip.into() }
    }
}

impl LineProvider for CdevLineProvider {
    fn acquire(&mut self, line_id: u32, consumer: &str, bias: Bias) -> Result<Box<dyn LineHandle>> {
        // A missing or inaccessible chip means no line can be requested at all.
        if let Err(e) = File::open(&self.chip) {
            return Err(AlarmError::HardwareUnavailable(format!("{}: {}", self.chip.display(), e)));
        }

        let bias = match bias {
            Bias::PullUp => CdevBias::PullUp,
            Bias::PullDown => CdevBias::PullDown,
            Bias::Disabled => CdevBias::Disabled,
        };

        let request = Request::builder()
            .on_chip(&self.chip)
            .with_consumer(consumer)
            .with_line(line_id)
            .as_input()
            .with_bias(bias)
            .request()
            .map_err(|e| AlarmError::LineAcquisitionFailed {
                line_id,
                reason: e.to_string(),
            })?;

        debug!("[GPIO] Requested line {} on {}", line_id, self.chip.display());
        Ok(Box::new(CdevLine {
            line_id,
            request: Some(request),
        }))
    }
}

struct CdevLine {
    line_id: u32,
    request: Option<Request>,
}

impl LineHandle for CdevLine {
    fn sample(&mut self) -> Result<bool> {
        let request = self.request.as_ref().ok_or_else(|| AlarmError::LineReadFailed {
            line_id: self.line_id,
            reason: "line already released".to_string(),
        })?;
        let value = request
            .value(self.line_id)
            .map_err(|e| AlarmError::LineReadFailed {
                line_id: self.line_id,
                reason: e.to_string(),
            })?;
        Ok(matches!(value, Value::Active))
    }

    fn release(&mut self) {
        // Dropping the request closes the line fd.
        if self.request.take().is_some() {
            debug!("[GPIO] Released line {}", self.line_id);
        }
    }
}
