//! Patient state store.
//!
//! Records are held as `Arc<Patient>` and never mutated in place: every
//! write clones the record, applies the change and swaps the new value in.
//! Snapshots handed out earlier keep seeing the version they were taken at.

use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::db::DbError;
use crate::models::{
    AlertSeverity, Gender, Patient, PatientId, PatientStatus, Vitals, VitalsHistory,
    DEFAULT_HISTORY_CAPACITY,
};

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unknown patient: {0}")]
    UnknownPatient(String),

    #[error("Duplicate patient id: {0}")]
    DuplicatePatient(String),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DbError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Details captured by the admission form.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionRequest {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub ward: String,
    pub bed: Option<String>,
    pub diagnosis: Option<String>,
    pub assigned_doctor: Option<String>,
}

impl AdmissionRequest {
    pub fn new(name: impl Into<String>, age: u32, gender: Gender, ward: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            gender,
            ward: ward.into(),
            bed: None,
            diagnosis: None,
            assigned_doctor: None,
        }
    }
}

/// Status filter used by the dashboard patient lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Critical,
    Warning,
}

impl StatusFilter {
    fn matches(&self, status: PatientStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Critical => status == PatientStatus::Critical,
            StatusFilter::Warning => status == PatientStatus::Warning,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "critical" => Ok(StatusFilter::Critical),
            "warning" => Ok(StatusFilter::Warning),
            other => Err(format!("unknown status filter: {}", other)),
        }
    }
}

/// Explicitly owned collection of patient records, in admission order.
#[derive(Debug, Clone)]
pub struct PatientStore {
    patients: Vec<Arc<Patient>>,
    history_capacity: usize,
    revision: u64,
}

impl PatientStore {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            patients: Vec::new(),
            history_capacity: history_capacity.max(1),
            revision: 0,
        }
    }

    /// Build a store from loaded records. Later duplicates of an id are dropped.
    pub fn with_patients(patients: Vec<Patient>, history_capacity: usize) -> Self {
        let mut store = Self::new(history_capacity);
        for patient in patients {
            if let Err(e) = store.insert(patient) {
                warn!("Skipping loaded record: {}", e);
            }
        }
        store.revision = 0;
        store
    }

    /// Add an existing record.
    pub fn insert(&mut self, mut patient: Patient) -> StoreResult<()> {
        if self.position(&patient.id).is_some() {
            return Err(StoreError::DuplicatePatient(patient.id));
        }
        patient.history.set_capacity(self.history_capacity);
        self.patients.push(Arc::new(patient));
        self.revision += 1;
        Ok(())
    }

    /// Admit a new patient with default vitals and Stable status.
    pub fn admit(&mut self, request: AdmissionRequest) -> PatientId {
        let id = self.next_id();
        let mut patient = Patient::new(
            id.clone(),
            request.name,
            request.age,
            request.gender,
            request.ward,
        );
        if let Some(bed) = request.bed {
            patient.bed = bed;
        }
        if let Some(doctor) = request.assigned_doctor {
            patient.assigned_doctor = doctor;
        }
        patient.diagnosis = request.diagnosis;
        patient.history = VitalsHistory::new(self.history_capacity);

        info!("Admitted patient {} ({})", id, patient.name);
        self.patients.push(Arc::new(patient));
        self.revision += 1;
        id
    }

    fn next_id(&self) -> PatientId {
        let mut n = self.patients.len() + 1;
        loop {
            let candidate = format!("p{}", n);
            if self.position(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.patients.iter().position(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Patient>> {
        self.position(id).map(|i| Arc::clone(&self.patients[i]))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// All records as shared snapshots.
    pub fn snapshot(&self) -> Vec<Arc<Patient>> {
        self.patients.clone()
    }

    /// Owned copies of every record, for persistence.
    pub fn to_vec(&self) -> Vec<Patient> {
        self.patients.iter().map(|p| (**p).clone()).collect()
    }

    pub fn ids(&self) -> Vec<PatientId> {
        self.patients.iter().map(|p| p.id.clone()).collect()
    }

    /// Ids of patients still receiving vitals updates.
    pub fn active_ids(&self) -> Vec<PatientId> {
        self.patients
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Counter bumped on every write that changed a record.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply `f` to a copy of the record and swap it in if anything changed.
    pub fn update<T>(&mut self, id: &str, f: impl FnOnce(&mut Patient) -> T) -> StoreResult<T> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::UnknownPatient(id.to_string()))?;

        let current = &self.patients[index];
        let mut next = Patient::clone(current);
        let result = f(&mut next);
        if next != **current {
            self.patients[index] = Arc::new(next);
            self.revision += 1;
        }
        Ok(result)
    }

    /// Write a new vitals snapshot and append it to the history.
    ///
    /// Discharged patients are left untouched and `false` is returned.
    pub fn record_vitals(&mut self, id: &str, vitals: Vitals, recorded_at: String) -> StoreResult<bool> {
        self.update(id, |patient| {
            if !patient.is_active() {
                return false;
            }
            patient.record_vitals(vitals, recorded_at);
            true
        })
    }

    pub fn add_charge(&mut self, id: &str, description: &str, cost: f64) -> StoreResult<Option<String>> {
        self.update(id, |patient| patient.add_charge(description, cost))
    }

    pub fn mark_medication_taken(&mut self, id: &str, medication_id: &str) -> StoreResult<bool> {
        self.update(id, |patient| patient.mark_medication_taken(medication_id))
    }

    pub fn raise_alert(&mut self, id: &str, message: &str, severity: AlertSeverity) -> StoreResult<String> {
        self.update(id, |patient| patient.raise_alert(message, severity))
    }

    pub fn acknowledge_alert(&mut self, id: &str, alert_id: &str) -> StoreResult<bool> {
        self.update(id, |patient| patient.acknowledge_alert(alert_id))
    }

    /// Case-insensitive name search combined with a status filter.
    pub fn search(&self, name_fragment: &str, filter: StatusFilter) -> Vec<Arc<Patient>> {
        let needle = name_fragment.trim().to_lowercase();
        self.patients
            .iter()
            .filter(|p| filter.matches(p.status))
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

impl Default for PatientStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::initial_patients;

    fn setup_store() -> PatientStore {
        PatientStore::with_patients(initial_patients(), DEFAULT_HISTORY_CAPACITY)
    }

    #[test]
    fn test_admit_assigns_next_id() {
        let mut store = setup_store();
        let id = store.admit(AdmissionRequest::new("Ada Lovelace", 36, Gender::Female, "Gen-A"));
        assert_eq!(id, "p5");

        let patient = store.get(&id).unwrap();
        assert_eq!(patient.status, PatientStatus::Stable);
        assert_eq!(patient.bed, "Wait");
        assert_eq!(patient.assigned_doctor, "Dr. OnCall");
        assert_eq!(patient.vitals, Vitals::admission_default());
    }

    #[test]
    fn test_admit_skips_taken_ids() {
        let mut store = PatientStore::new(5);
        let mut existing = initial_patients().remove(1);
        existing.id = "p1".into();
        store.insert(existing).unwrap();

        let id = store.admit(AdmissionRequest::new("New", 30, Gender::Other, "Gen-B"));
        assert_eq!(id, "p2");
        let id = store.admit(AdmissionRequest::new("Newer", 31, Gender::Other, "Gen-B"));
        assert_eq!(id, "p3");
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = setup_store();
        let duplicate = initial_patients().remove(0);
        assert!(matches!(
            store.insert(duplicate),
            Err(StoreError::DuplicatePatient(id)) if id == "p1"
        ));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_update_is_copy_on_write() {
        let mut store = setup_store();
        let before = store.get("p1").unwrap();
        let revision = store.revision();

        store
            .update("p1", |p| p.bed = "07".into())
            .unwrap();

        assert_eq!(before.bed, "01");
        assert_eq!(store.get("p1").unwrap().bed, "07");
        assert_eq!(store.revision(), revision + 1);
    }

    #[test]
    fn test_noop_update_keeps_revision() {
        let mut store = setup_store();
        let revision = store.revision();
        let changed = store.mark_medication_taken("p1", "m2").unwrap();
        assert!(!changed);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_unknown_patient() {
        let mut store = setup_store();
        assert!(matches!(
            store.add_charge("p99", "MRI Scan", 800.0),
            Err(StoreError::UnknownPatient(_))
        ));
    }

    #[test]
    fn test_record_vitals_skips_discharged() {
        let mut store = setup_store();
        store
            .update("p4", |p| p.status = PatientStatus::Discharged)
            .unwrap();
        let vitals = Vitals {
            heart_rate: 150,
            ..Vitals::default()
        };

        assert!(!store.record_vitals("p4", vitals, "now".into()).unwrap());
        assert_eq!(store.get("p4").unwrap().vitals.heart_rate, 68);
        assert_eq!(store.active_ids(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_search() {
        let store = setup_store();
        let found = store.search("garc", StatusFilter::All);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "p2");

        let critical = store.search("", StatusFilter::Critical);
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].id, "p3");

        assert!(store.search("wilson", StatusFilter::Warning).is_empty());
        assert_eq!("Critical".parse::<StatusFilter>(), Ok(StatusFilter::Critical));
    }

    #[test]
    fn test_care_actions() {
        let mut store = setup_store();
        let bill = store.add_charge("p1", "MRI Scan", 800.0).unwrap();
        assert!(bill.is_some());
        assert_eq!(store.get("p1").unwrap().billing_total(), 1150.0);

        let alert = store.raise_alert("p4", "Fall risk", AlertSeverity::Low).unwrap();
        assert!(store.acknowledge_alert("p4", &alert).unwrap());
        assert!(!store.acknowledge_alert("p4", &alert).unwrap());
    }
}
