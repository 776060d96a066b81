//! In-memory fakes shared by the unit tests.

use crate::error::{AlarmError, Result};
use crate::input::gpio::{Bias, LineHandle, LineProvider};
use crate::mqtt::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Transport that records every send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String, u8)>>,
    fail: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(String, String, u8)> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, topic: &str, payload: &str, priority: u8) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AlarmError::Transport("broker rejected publish".to_string()));
        }
        self.sent
            .lock()
            .push((topic.to_string(), payload.to_string(), priority));
        Ok(())
    }
}

/// Transport whose sends yield mid-flight and count overlapping calls.
#[derive(Default)]
pub struct YieldingTransport {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sent: AtomicUsize,
}

impl YieldingTransport {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for YieldingTransport {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, _topic: &str, _payload: &str, _priority: u8) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct Board {
    levels: BTreeMap<u32, bool>,
    broken: BTreeSet<u32>,
    unreadable: BTreeSet<u32>,
    released: Vec<u32>,
    requests: Vec<(u32, String, Bias)>,
}

/// Simulated GPIO chip whose levels the test sets directly.
#[derive(Clone, Default)]
pub struct FakeBoard {
    board: Arc<Mutex<Board>>,
    unavailable: Arc<AtomicBool>,
}

impl FakeBoard {
    pub fn set_level(&self, line_id: u32, level: bool) {
        self.board.lock().levels.insert(line_id, level);
    }

    /// Requests for this line fail individually.
    pub fn break_line(&self, line_id: u32) {
        self.board.lock().broken.insert(line_id);
    }

    /// Samples of this line fail.
    pub fn make_unreadable(&self, line_id: u32) {
        self.board.lock().unreadable.insert(line_id);
    }

    /// Every request fails as if the driver were missing.
    pub fn unplug(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    pub fn released(&self) -> Vec<u32> {
        self.board.lock().released.clone()
    }

    pub fn requests(&self) -> Vec<(u32, String, Bias)> {
        self.board.lock().requests.clone()
    }

    pub fn provider(&self) -> Box<dyn LineProvider> {
        Box::new(self.clone())
    }
}

impl LineProvider for FakeBoard {
    fn acquire(&mut self, line_id: u32, consumer: &str, bias: Bias) -> Result<Box<dyn LineHandle>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AlarmError::HardwareUnavailable("no gpio chip".to_string()));
        }
        let mut board = self.board.lock();
        board.requests.push((line_id, consumer.to_string(), bias));
        if board.broken.contains(&line_id) {
            return Err(AlarmError::LineAcquisitionFailed {
                line_id,
                reason: "line busy".to_string(),
            });
        }
        Ok(Box::new(FakeLine {
            line_id,
            board: self.board.clone(),
            released: false,
        }))
    }
}

struct FakeLine {
    line_id: u32,
    board: Arc<Mutex<Board>>,
    released: bool,
}

impl LineHandle for FakeLine {
    fn sample(&mut self) -> Result<bool> {
        let board = self.board.lock();
        if self.released || board.unreadable.contains(&self.line_id) {
            return Err(AlarmError::LineReadFailed {
                line_id: self.line_id,
                reason: "read error".to_string(),
            });
        }
        // Pull-up: an unconnected line reads high.
        Ok(board.levels.get(&self.line_id).copied().unwrap_or(true))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.board.lock().released.push(self.line_id);
        }
    }
}
