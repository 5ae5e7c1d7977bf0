//! Persisted patient list.
//!
//! The whole list is stored as one JSON document under a single key. Reads
//! never fail on bad data: a missing record is initialised with the default
//! ward and a corrupt one is logged and replaced by it in memory.

use log::{info, warn};

use super::{Database, DbResult};
use crate::models::{initial_patients, Patient};

/// Where a loaded patient list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Parsed from the stored record
    Stored,
    /// No record existed; defaults were written
    DefaultsMissing,
    /// The record could not be parsed; defaults are in use
    DefaultsCorrupt,
}

/// Result of loading the patient list.
#[derive(Debug, Clone)]
pub struct PatientSnapshot {
    pub patients: Vec<Patient>,
    pub source: SnapshotSource,
}

impl Database {
    /// Load the patient list stored under `key`.
    pub fn load_patients(&self, key: &str) -> DbResult<PatientSnapshot> {
        let Some(raw) = self.get_state(key)? else {
            info!("No stored patients under {}, writing defaults", key);
            let patients = initial_patients();
            self.save_patients(key, &patients)?;
            return Ok(PatientSnapshot {
                patients,
                source: SnapshotSource::DefaultsMissing,
            });
        };

        match serde_json::from_str::<Vec<Patient>>(&raw) {
            Ok(patients) => Ok(PatientSnapshot {
                patients,
                source: SnapshotSource::Stored,
            }),
            Err(e) => {
                warn!("Stored patients under {} are corrupt, using defaults: {}", key, e);
                Ok(PatientSnapshot {
                    patients: initial_patients(),
                    source: SnapshotSource::DefaultsCorrupt,
                })
            }
        }
    }

    /// Overwrite the patient list stored under `key`.
    pub fn save_patients(&self, key: &str, patients: &[Patient]) -> DbResult<()> {
        let json = serde_json::to_string(patients)?;
        self.set_state(key, &json)
    }
}

/// Destination for whole-list patient snapshots.
pub trait PatientSink: Send {
    fn save_patients(&mut self, key: &str, patients: &[Patient]) -> DbResult<()>;
}

impl PatientSink for Database {
    fn save_patients(&mut self, key: &str, patients: &[Patient]) -> DbResult<()> {
        Database::save_patients(self, key, patients)
    }
}
