//! Sensor simulation for headless operation and testing.
//!
//! Provides simulated contact sensor transitions that travel the same
//! [`Publisher`] path as real ones.

use crate::config::SimulationConfig;
use crate::mqtt::Publisher;
use crate::sensors::{Event, SensorRegistry, Status};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

struct SimulatorState {
    registry: Arc<SensorRegistry>,
    publisher: Arc<Publisher>,
    /// Simulated level per line, `true` = open.
    mock_values: Mutex<BTreeMap<u32, bool>>,
    warm_up: Duration,
    interval: Duration,
}

impl SimulatorState {
    async fn run_cycle(&self) -> usize {
        let mut delivered = 0;
        for (line_id, name) in self.registry.iter() {
            let level = {
                let mut values = self.mock_values.lock();
                let value = values.entry(line_id).or_insert(true);
                *value = !*value;
                *value
            };

            let status = Status::from_level(level);
            info!("[Sim] {} (line {}) toggled to {}", name, line_id, status);
            let event =
                Event::new(status, line_id, name).with_priority(Event::AUTHORITATIVE_PRIORITY);
            match self.publisher.publish(&event).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("[Sim] {}", e),
            }
        }
        delivered
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(self.warm_up) => {}
        }

        loop {
            let delivered = self.run_cycle().await;
            debug!("[Sim] Cycle done, {} event(s) delivered", delivered);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically flips every configured sensor and publishes the result.
pub struct SensorSimulator {
    state: Arc<SimulatorState>,
    task: AsyncMutex<Option<Running>>,
}

impl SensorSimulator {
    /// Every simulated sensor starts open.
    pub fn new(
        registry: Arc<SensorRegistry>,
        publisher: Arc<Publisher>,
        config: &SimulationConfig,
    ) -> Self {
        let mock_values = registry.line_ids().map(|id| (id, true)).collect();
        Self {
            state: Arc::new(SimulatorState {
                registry,
                publisher,
                mock_values: Mutex::new(mock_values),
                warm_up: config.warm_up(),
                interval: config.interval(),
            }),
            task: AsyncMutex::new(None),
        }
    }

    /// Spawn the simulation task. The first cycle runs after the warm-up delay.
    ///
    /// Does nothing if the simulator is already running.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            warn!("[Sim] Simulator already running");
            return;
        }

        info!(
            "[Sim] Starting sensor simulation for {} sensor(s), first cycle in {:?}",
            self.state.registry.len(),
            self.state.warm_up
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.state.clone().run(cancel.clone()));
        *task = Some(Running { cancel, handle });
    }

    /// Flip every sensor once and publish each new status.
    ///
    /// Returns the number of events the publisher accepted.
    pub async fn run_cycle(&self) -> usize {
        self.state.run_cycle().await
    }

    /// Signal the task to stop and wait until it has exited.
    ///
    /// A cycle already in progress finishes first. Holding the task lock for
    /// the whole call keeps `start` out until the old task is gone.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        let Some(running) = task.take() else {
            return;
        };

        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            warn!("[Sim] Simulation task ended abnormally: {}", e);
        }
        info!("[Sim] Sensor simulation stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// Current simulated level of a line, `true` = open.
    pub fn mock_value(&self, line_id: u32) -> Option<bool> {
        self.state.mock_values.lock().get(&line_id).copied()
    }
}
