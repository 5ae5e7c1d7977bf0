//! Simulation configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DEFAULT_HISTORY_CAPACITY;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Key under which the patient list is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "pulseguard_patients";

/// Timing and sizing for a simulation run. Missing fields take defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Ward-wide vitals driver cadence
    pub vitals_interval_ms: u64,
    /// Single-patient view driver cadence
    pub view_interval_ms: u64,
    /// Network-quality indicator cadence
    pub network_interval_ms: u64,
    /// Samples kept per patient history
    pub history_capacity: usize,
    /// Delay before a pending discharge is decided
    pub discharge_decision_delay_ms: u64,
    /// Message delivery delay when escalating to a doctor
    pub escalation_message_delay_ms: u64,
    /// Delay between message delivery and the incoming call
    pub escalation_call_delay_ms: u64,
    pub call_connecting_ms: u64,
    pub call_ringing_ms: u64,
    pub network_latency_min_ms: u32,
    pub network_latency_max_ms: u32,
    /// Approval probability for the demo discharge decider
    pub discharge_approve_probability: f64,
    /// Fixed seed for reproducible runs; entropy when absent
    pub rng_seed: Option<u64>,
    pub storage_key: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            vitals_interval_ms: 3000,
            view_interval_ms: 2000,
            network_interval_ms: 2000,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            discharge_decision_delay_ms: 3000,
            escalation_message_delay_ms: 1500,
            escalation_call_delay_ms: 500,
            call_connecting_ms: 1500,
            call_ringing_ms: 2500,
            network_latency_min_ms: 5,
            network_latency_max_ms: 30,
            discharge_approve_probability: crate::workflow::DEFAULT_APPROVE_PROBABILITY,
            rng_seed: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Default vitals cadence: the view cadence when one patient is observed,
    /// the ward cadence otherwise.
    pub fn driver_interval_ms(&self, observing: bool) -> u64 {
        if observing {
            self.view_interval_ms
        } else {
            self.vitals_interval_ms
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let intervals = [
            ("vitalsIntervalMs", self.vitals_interval_ms),
            ("viewIntervalMs", self.view_interval_ms),
            ("networkIntervalMs", self.network_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "historyCapacity must be positive".into(),
            ));
        }
        if self.network_latency_min_ms > self.network_latency_max_ms {
            return Err(ConfigError::Invalid(format!(
                "network latency bounds inverted: {} > {}",
                self.network_latency_min_ms, self.network_latency_max_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.discharge_approve_probability) {
            return Err(ConfigError::Invalid(
                "dischargeApproveProbability must be within [0, 1]".into(),
            ));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storageKey must not be empty".into()));
        }
        Ok(())
    }
}
