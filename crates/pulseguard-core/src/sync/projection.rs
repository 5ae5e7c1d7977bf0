//! Subscriber-side view of a single patient.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::channel::{Subscription, SyncChannel, SyncMessage};
use crate::models::{MedicationStatus, Patient, PatientId, Vitals};

/// Local copy of the synced parts of one patient record.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientProjection {
    patient_id: PatientId,
    vitals: Option<Vitals>,
    medications: HashMap<String, MedicationStatus>,
    last_sync: Option<String>,
    update_count: u64,
}

impl PatientProjection {
    pub fn new(patient_id: impl Into<PatientId>) -> Self {
        Self {
            patient_id: patient_id.into(),
            vitals: None,
            medications: HashMap::new(),
            last_sync: None,
            update_count: 0,
        }
    }

    /// Start from a store snapshot of the patient.
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            patient_id: patient.id.clone(),
            vitals: Some(patient.vitals),
            medications: patient
                .medications
                .iter()
                .map(|m| (m.id.clone(), m.status))
                .collect(),
            last_sync: None,
            update_count: 0,
        }
    }

    /// Apply a message. Messages for other patients are ignored.
    pub fn apply(&mut self, message: &SyncMessage) -> bool {
        if message.patient_id() != self.patient_id {
            return false;
        }
        match message {
            SyncMessage::VitalsUpdate { vitals, .. } => {
                self.vitals = Some(*vitals);
            }
            SyncMessage::MedicationUpdate {
                medication_id,
                status,
                ..
            } => {
                self.medications.insert(medication_id.clone(), *status);
            }
        }
        self.last_sync = Some(chrono::Utc::now().to_rfc3339());
        self.update_count += 1;
        true
    }

    /// Subscribe a shared projection to `channel`. Updates stop when the
    /// returned subscription is dropped.
    pub fn follow(self, channel: &SyncChannel) -> (Arc<Mutex<PatientProjection>>, Subscription) {
        let patient_id = self.patient_id.clone();
        let shared = Arc::new(Mutex::new(self));
        let target = Arc::clone(&shared);
        let subscription = channel.subscribe(&patient_id, move |message| {
            if let Ok(mut projection) = target.lock() {
                projection.apply(message);
            }
        });
        (shared, subscription)
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn vitals(&self) -> Option<&Vitals> {
        self.vitals.as_ref()
    }

    pub fn medication_status(&self, medication_id: &str) -> Option<MedicationStatus> {
        self.medications.get(medication_id).copied()
    }

    pub fn last_sync(&self) -> Option<&str> {
        self.last_sync.as_deref()
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}
