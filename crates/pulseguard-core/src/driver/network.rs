//! Simulated network-quality indicator.

use rand::Rng;

use crate::models::SimulationState;

/// Jitters the reported latency on each tick.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    min_latency_ms: u32,
    max_latency_ms: u32,
    state: SimulationState,
}

impl NetworkMonitor {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min_latency_ms: u32, max_latency_ms: u32) -> Self {
        let (min_latency_ms, max_latency_ms) = if min_latency_ms <= max_latency_ms {
            (min_latency_ms, max_latency_ms)
        } else {
            (max_latency_ms, min_latency_ms)
        };
        Self {
            min_latency_ms,
            max_latency_ms,
            state: SimulationState::default(),
        }
    }

    /// Draw a new latency and stamp the sync time.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R, now_ms: u64) -> SimulationState {
        self.state.latency_ms = rng.gen_range(self.min_latency_ms..=self.max_latency_ms);
        self.state.last_sync_ms = now_ms;
        self.state
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.state.connected = connected;
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }
}
