//! Polled, debounced monitoring of contact sensor lines.
//!
//! Each configured line is requested as a pulled-up input. On every poll the
//! line is sampled and compared with the last accepted level; a change is
//! accepted only once the debounce window since the previous accepted change
//! has elapsed. Accepted changes become [`Event`]s handed to the [`Publisher`].

use super::{Event, SensorRegistry, Status};
use crate::error::{AlarmError, Result};
use crate::input::gpio::{Bias, CONSUMER_NAME, LineHandle, LineProvider};
use crate::mqtt::Publisher;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum time between two accepted transitions of the same line.
pub const DEBOUNCE: Duration = Duration::from_millis(50);

struct MonitoredLine {
    handle: Box<dyn LineHandle>,
    /// Last accepted level, `None` until the first sample.
    last_value: Option<bool>,
    last_change_at: Option<Instant>,
}

/// An accepted transition and the outcome of publishing it.
#[derive(Debug)]
pub struct Transition {
    pub event: Event,
    pub delivery: Result<()>,
}

/// Owns the acquired lines and their debounced state.
///
/// Driven by an external timer through [`SensorMonitor::poll`]; `poll` and
/// `close` must not run concurrently.
pub struct SensorMonitor {
    registry: Arc<SensorRegistry>,
    provider: Box<dyn LineProvider>,
    publisher: Arc<Publisher>,
    real_hardware: bool,
    debounce: Duration,
    lines: BTreeMap<u32, MonitoredLine>,
}

impl SensorMonitor {
    /// Create a monitor holding no lines yet.
    ///
    /// With `real_hardware` false, [`SensorMonitor::connect`] never touches `provider`.
    pub fn new(
        registry: Arc<SensorRegistry>,
        provider: Box<dyn LineProvider>,
        publisher: Arc<Publisher>,
        real_hardware: bool,
    ) -> Self {
        Self {
            registry,
            provider,
            publisher,
            real_hardware,
            debounce: DEBOUNCE,
            lines: BTreeMap::new(),
        }
    }

    /// Override the default 50 ms debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Request every configured line.
    ///
    /// Never fails: a missing GPIO subsystem leaves the monitor without lines,
    /// a single unavailable line is skipped. Returns the number of lines held.
    pub fn connect(&mut self) -> usize {
        if !self.real_hardware {
            info!("[Monitor] Mock mode, not requesting GPIO lines");
            return 0;
        }
        if !self.lines.is_empty() {
            warn!("[Monitor] Already connected to {} line(s)", self.lines.len());
            return self.lines.len();
        }

        let line_ids: Vec<u32> = self.registry.line_ids().collect();
        for line_id in line_ids {
            match self.provider.acquire(line_id, CONSUMER_NAME, Bias::PullUp) {
                Ok(handle) => {
                    debug!("[Monitor] Acquired line {}", line_id);
                    self.lines.insert(
                        line_id,
                        MonitoredLine {
                            handle,
                            last_value: None,
                            last_change_at: None,
                        },
                    );
                }
                Err(AlarmError::HardwareUnavailable(reason)) => {
                    warn!(
                        "[Monitor] GPIO unavailable ({}), continuing without sensors",
                        reason
                    );
                    self.close();
                    return 0;
                }
                Err(e) => {
                    error!("[Monitor] {}", e);
                }
            }
        }

        info!(
            "[Monitor] Monitoring {} of {} configured line(s)",
            self.lines.len(),
            self.registry.len()
        );
        self.lines.len()
    }

    /// Sample every held line and publish accepted transitions.
    ///
    /// Delivery failures are reported per transition and do not roll back the
    /// debounced state.
    pub async fn poll(&mut self) -> Result<Vec<Transition>> {
        self.poll_at(Instant::now()).await
    }

    async fn poll_at(&mut self, now: Instant) -> Result<Vec<Transition>> {
        if self.lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for (&line_id, line) in self.lines.iter_mut() {
            let value = match line.handle.sample() {
                Ok(v) => v,
                Err(e) => {
                    error!("[Monitor] {}", e);
                    continue;
                }
            };

            let accepted = match (line.last_value, line.last_change_at) {
                (Some(previous), _) if previous == value => false,
                (Some(_), Some(changed_at)) => {
                    now.saturating_duration_since(changed_at) > self.debounce
                }
                _ => true,
            };
            if !accepted {
                continue;
            }

            line.last_value = Some(value);
            line.last_change_at = Some(now);

            let name = self.registry.name_of(line_id)?;
            let status = Status::from_level(value);
            debug!("[Monitor] The {} sensor is {}", name, status);
            events.push(
                Event::new(status, line_id, name).with_priority(Event::AUTHORITATIVE_PRIORITY),
            );
        }

        let mut transitions = Vec::with_capacity(events.len());
        for event in events {
            let delivery = self.publisher.publish(&event).await;
            transitions.push(Transition { event, delivery });
        }
        Ok(transitions)
    }

    /// Release every held line. Safe to call repeatedly.
    pub fn close(&mut self) {
        for (line_id, mut line) in std::mem::take(&mut self.lines) {
            line.handle.release();
            debug!("[Monitor] Released line {}", line_id);
        }
    }

    /// Name of the sensor configured on `line_id`.
    pub fn name_from_line(&self, line_id: u32) -> Result<&str> {
        self.registry.name_of(line_id)
    }

    /// Ids of the lines currently held, ascending.
    pub fn acquired_lines(&self) -> Vec<u32> {
        self.lines.keys().copied().collect()
    }
}

impl Drop for SensorMonitor {
    fn drop(&mut self) {
        self.close();
    }
}
