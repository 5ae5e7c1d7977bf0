//! Network-quality indicator shown by the dashboards.

use serde::{Deserialize, Serialize};

/// Simulated link quality, independent of patient data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    /// Whether the link is up
    pub connected: bool,
    /// Round-trip latency in milliseconds
    pub latency_ms: u32,
    /// Clock time of the last sync, in milliseconds
    pub last_sync_ms: u64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            connected: true,
            latency_ms: 15,
            last_sync_ms: 0,
        }
    }
}
