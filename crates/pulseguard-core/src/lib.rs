//! PulseGuard Core Library
//!
//! Ward monitoring simulation shared by the doctor, nurse and patient
//! dashboards: simulated vitals, clinical status workflows and cross-view
//! synchronization.
//!
//! # Architecture
//!
//! ```text
//!        Driver tick (Scheduler)
//!                │
//!                ▼
//!   Vitals Generator: next = f(current, status)
//!                │
//!                ▼
//!   Patient Store: copy-on-write record, history window
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//!   Sync Channel     Snapshot (SQLite)
//!        │
//!        ▼
//!   Subscribed views update their projection
//! ```
//!
//! Clinical actions (escalation, discharge, care actions) go through the
//! same [`driver::Simulation`], which schedules their delayed follow-ups on
//! the driver's timers.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, Vitals, DischargeRequest, etc.)
//! - [`vitals`]: Vitals generator and reading assessment
//! - [`workflow`]: Status state machine, discharge and escalation
//! - [`sync`]: Cross-view sync channel and projections
//! - [`store`]: Patient state store
//! - [`driver`]: Clocks, scheduler and the simulation loop
//! - [`db`]: SQLite snapshot persistence
//! - [`identity`]: Identity provider contract and roles
//! - [`config`]: Simulation configuration

pub mod config;
pub mod db;
pub mod driver;
pub mod identity;
pub mod models;
pub mod store;
pub mod sync;
pub mod vitals;
pub mod workflow;

// Re-export commonly used types
pub use config::SimulationConfig;
pub use db::Database;
pub use driver::{DriverSpec, Simulation};
pub use models::{Patient, PatientStatus, Vitals};
pub use store::{AdmissionRequest, PatientStore, StatusFilter};
pub use sync::{SyncChannel, SyncMessage};
pub use workflow::{TransitionOutcome, TransitionRejection};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use models::Gender;
use sync::Subscription;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PulseguardError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for PulseguardError {
    fn from(e: db::DbError) -> Self {
        PulseguardError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for PulseguardError {
    fn from(e: serde_json::Error) -> Self {
        PulseguardError::SerializationError(e.to_string())
    }
}

impl From<store::StoreError> for PulseguardError {
    fn from(e: store::StoreError) -> Self {
        match e {
            store::StoreError::UnknownPatient(id) => PulseguardError::NotFound(id),
            store::StoreError::DuplicatePatient(id) => {
                PulseguardError::InvalidInput(format!("Duplicate patient id: {}", id))
            }
            store::StoreError::Persistence(e) => PulseguardError::DatabaseError(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for PulseguardError {
    fn from(e: config::ConfigError) -> Self {
        PulseguardError::ConfigError(e.to_string())
    }
}

impl From<TransitionRejection> for PulseguardError {
    fn from(r: TransitionRejection) -> Self {
        PulseguardError::Rejected(r.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PulseguardError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PulseguardError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open a wall-clock simulation backed by the database at `path`.
///
/// `config_json` overrides the default configuration when given.
#[uniffi::export]
pub fn open_simulation(
    path: String,
    config_json: Option<String>,
) -> Result<Arc<PulseguardCore>, PulseguardError> {
    let config = match config_json {
        Some(json) => SimulationConfig::from_json_str(&json)?,
        None => SimulationConfig::default(),
    };
    let db = Database::open(&path)?;
    let snapshot = db.load_patients(&config.storage_key)?;
    let store = PatientStore::with_patients(snapshot.patients, config.history_capacity);
    let sim = Simulation::real_time(config, store).with_sink(Box::new(db));
    Ok(PulseguardCore::wrap(sim))
}

/// Open a virtual-time simulation over an in-memory database (for testing).
#[uniffi::export]
pub fn open_simulation_in_memory(seed: Option<u64>) -> Result<Arc<PulseguardCore>, PulseguardError> {
    let config = SimulationConfig {
        rng_seed: seed,
        ..Default::default()
    };
    let db = Database::open_in_memory()?;
    let snapshot = db.load_patients(&config.storage_key)?;
    let store = PatientStore::with_patients(snapshot.patients, config.history_capacity);
    let sim = Simulation::virtual_time(config, store).with_sink(Box::new(db));
    Ok(PulseguardCore::wrap(sim))
}

// =========================================================================
// Main API Object
// =========================================================================

struct Feed {
    queue: Arc<Mutex<VecDeque<SyncMessage>>>,
    _subscription: Subscription,
}

/// Thread-safe simulation wrapper for FFI.
///
/// Views poll their subscriptions instead of receiving callbacks.
#[derive(uniffi::Object)]
pub struct PulseguardCore {
    sim: Arc<Mutex<Simulation>>,
    feeds: Mutex<HashMap<u64, Feed>>,
}

impl PulseguardCore {
    fn wrap(sim: Simulation) -> Arc<Self> {
        Arc::new(Self {
            sim: Arc::new(Mutex::new(sim)),
            feeds: Mutex::new(HashMap::new()),
        })
    }

    fn transition(
        &self,
        f: impl FnOnce(&mut Simulation) -> store::StoreResult<TransitionOutcome>,
    ) -> Result<FfiTransition, PulseguardError> {
        let mut sim = self.sim.lock()?;
        Ok(f(&mut sim)?.into())
    }
}

#[uniffi::export]
impl PulseguardCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// List patients matching a name fragment and a status filter
    /// ("all", "critical" or "warning").
    pub fn list_patients(
        &self,
        query: String,
        filter: String,
    ) -> Result<Vec<FfiPatient>, PulseguardError> {
        let filter: StatusFilter = filter.parse().map_err(PulseguardError::InvalidInput)?;
        let sim = self.sim.lock()?;
        Ok(sim
            .store()
            .search(&query, filter)
            .iter()
            .map(|p| FfiPatient::from(p.as_ref()))
            .collect())
    }

    pub fn get_patient(&self, patient_id: String) -> Result<Option<FfiPatient>, PulseguardError> {
        let sim = self.sim.lock()?;
        Ok(sim.patient(&patient_id).map(|p| FfiPatient::from(p.as_ref())))
    }

    /// Admit a patient and return the assigned id.
    pub fn admit_patient(&self, admission: FfiAdmission) -> Result<String, PulseguardError> {
        let request = AdmissionRequest::try_from(admission)?;
        let mut sim = self.sim.lock()?;
        Ok(sim.admit(request))
    }

    // =========================================================================
    // Status Workflow
    // =========================================================================

    pub fn escalate_to_critical(&self, patient_id: String) -> Result<FfiTransition, PulseguardError> {
        self.transition(|sim| sim.escalate_to_critical(&patient_id))
    }

    pub fn acknowledge_critical(&self, patient_id: String) -> Result<FfiTransition, PulseguardError> {
        self.transition(|sim| sim.acknowledge_critical(&patient_id))
    }

    pub fn place_under_care(&self, patient_id: String) -> Result<FfiTransition, PulseguardError> {
        self.transition(|sim| sim.place_under_care(&patient_id))
    }

    pub fn request_discharge(
        &self,
        patient_id: String,
        note: Option<String>,
    ) -> Result<FfiTransition, PulseguardError> {
        self.transition(|sim| sim.request_discharge(&patient_id, note))
    }

    pub fn approve_discharge(&self, patient_id: String) -> Result<FfiTransition, PulseguardError> {
        self.transition(|sim| sim.approve_discharge(&patient_id))
    }

    pub fn reject_discharge(
        &self,
        patient_id: String,
        reason: Option<String>,
    ) -> Result<FfiTransition, PulseguardError> {
        self.transition(|sim| sim.reject_discharge(&patient_id, reason))
    }

    // =========================================================================
    // Escalate to Doctor
    // =========================================================================

    pub fn escalate_to_doctor(&self, patient_id: String) -> Result<FfiEscalation, PulseguardError> {
        let mut sim = self.sim.lock()?;
        let phase = sim.escalate_to_doctor(&patient_id)??;
        Ok(FfiEscalation {
            phase: phase.label().to_string(),
            call_seconds: 0,
        })
    }

    pub fn escalation_state(
        &self,
        patient_id: String,
    ) -> Result<Option<FfiEscalation>, PulseguardError> {
        let sim = self.sim.lock()?;
        Ok(sim.escalation(&patient_id).map(|e| FfiEscalation {
            phase: e.phase.label().to_string(),
            call_seconds: e.call_seconds,
        }))
    }

    pub fn end_call(&self, patient_id: String) -> Result<FfiTransition, PulseguardError> {
        let mut sim = self.sim.lock()?;
        let summary = sim.end_call(&patient_id)??;
        Ok(summary.outcome.into())
    }

    // =========================================================================
    // Care Actions
    // =========================================================================

    /// Add a charge; returns the bill item id, or none for a refused cost.
    pub fn add_charge(
        &self,
        patient_id: String,
        description: String,
        cost: f64,
    ) -> Result<Option<String>, PulseguardError> {
        let mut sim = self.sim.lock()?;
        Ok(sim.add_charge(&patient_id, &description, cost)?)
    }

    pub fn mark_medication_taken(
        &self,
        patient_id: String,
        medication_id: String,
    ) -> Result<bool, PulseguardError> {
        let mut sim = self.sim.lock()?;
        Ok(sim.mark_medication_taken(&patient_id, &medication_id)?)
    }

    pub fn acknowledge_alert(
        &self,
        patient_id: String,
        alert_id: String,
    ) -> Result<bool, PulseguardError> {
        let mut sim = self.sim.lock()?;
        Ok(sim.acknowledge_alert(&patient_id, &alert_id)?)
    }

    // =========================================================================
    // Driver and Time
    // =========================================================================

    /// Start a vitals driver; publishes only `observed_patient_id` when given.
    /// Without an interval the configured view or ward cadence applies.
    pub fn start_vitals_driver(
        &self,
        interval_ms: Option<u64>,
        observed_patient_id: Option<String>,
    ) -> Result<u64, PulseguardError> {
        if interval_ms == Some(0) {
            return Err(PulseguardError::InvalidInput(
                "interval must be positive".into(),
            ));
        }
        let mut sim = self.sim.lock()?;
        let id = match interval_ms {
            Some(interval_ms) => sim.start_vitals_driver(DriverSpec {
                interval_ms,
                observed: observed_patient_id,
            }),
            None => sim.start_default_driver(observed_patient_id),
        };
        Ok(id.raw())
    }

    pub fn stop_vitals_driver(&self, driver_id: u64) -> Result<bool, PulseguardError> {
        let mut sim = self.sim.lock()?;
        let id = sim.driver_ids().into_iter().find(|d| d.raw() == driver_id);
        Ok(id.map(|id| sim.stop_driver(id)).unwrap_or(false))
    }

    pub fn start_network_monitor(&self) -> Result<(), PulseguardError> {
        self.sim.lock()?.start_network_monitor();
        Ok(())
    }

    /// Run jobs that are due now. Returns how many ran.
    pub fn run_due(&self) -> Result<u32, PulseguardError> {
        let ran = self.sim.lock()?.run_due();
        Ok(u32::try_from(ran).unwrap_or(u32::MAX))
    }

    /// Advance virtual time. Returns how many jobs ran.
    pub fn advance_ms(&self, ms: u64) -> Result<u32, PulseguardError> {
        let ran = self.sim.lock()?.advance(ms);
        Ok(u32::try_from(ran).unwrap_or(u32::MAX))
    }

    pub fn network_state(&self) -> Result<FfiNetworkState, PulseguardError> {
        let state = self.sim.lock()?.network_state();
        Ok(FfiNetworkState {
            connected: state.connected,
            latency_ms: state.latency_ms,
            last_sync_ms: state.last_sync_ms,
        })
    }

    /// Stop every timer and close the sync channel.
    pub fn shutdown(&self) -> Result<(), PulseguardError> {
        self.feeds.lock()?.clear();
        self.sim.lock()?.shutdown();
        Ok(())
    }

    // =========================================================================
    // Sync Subscriptions
    // =========================================================================

    /// Subscribe to updates for one patient. Returns a subscription id.
    pub fn subscribe(&self, patient_id: String) -> Result<u64, PulseguardError> {
        let channel = self.sim.lock()?.channel().clone();
        if !channel.is_connected() {
            return Err(PulseguardError::InvalidInput("sync channel is closed".into()));
        }

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let sink = Arc::clone(&queue);
        let subscription = channel.subscribe(&patient_id, move |message| {
            if let Ok(mut pending) = sink.lock() {
                pending.push_back(message.clone());
            }
        });

        let id = subscription.id();
        self.feeds.lock()?.insert(
            id,
            Feed {
                queue,
                _subscription: subscription,
            },
        );
        Ok(id)
    }

    /// Drain updates received since the last poll, oldest first.
    pub fn poll_updates(&self, subscription_id: u64) -> Result<Vec<FfiSyncUpdate>, PulseguardError> {
        let feeds = self.feeds.lock()?;
        let feed = feeds
            .get(&subscription_id)
            .ok_or_else(|| PulseguardError::NotFound(format!("subscription {}", subscription_id)))?;
        let mut queue = feed.queue.lock()?;
        Ok(queue.drain(..).map(FfiSyncUpdate::from).collect())
    }

    pub fn unsubscribe(&self, subscription_id: u64) -> Result<bool, PulseguardError> {
        Ok(self.feeds.lock()?.remove(&subscription_id).is_some())
    }

    pub fn is_sync_connected(&self) -> Result<bool, PulseguardError> {
        Ok(self.sim.lock()?.channel().is_connected())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe vitals snapshot.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiVitals {
    pub heart_rate: u16,
    pub blood_pressure_systolic: u16,
    pub blood_pressure_diastolic: u16,
    pub spo2: u16,
    pub temperature: f64,
    pub respiratory_rate: u16,
}

impl From<Vitals> for FfiVitals {
    fn from(v: Vitals) -> Self {
        Self {
            heart_rate: v.heart_rate,
            blood_pressure_systolic: v.blood_pressure_systolic,
            blood_pressure_diastolic: v.blood_pressure_diastolic,
            spo2: v.spo2,
            temperature: v.temperature,
            respiratory_rate: v.respiratory_rate,
        }
    }
}

/// FFI-safe patient summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub ward: String,
    pub bed: String,
    pub diagnosis: Option<String>,
    pub assigned_doctor: String,
    pub status: String,
    pub vitals: FfiVitals,
    pub vitals_warning: bool,
    pub heart_rate_history: Vec<u16>,
    pub spo2_history: Vec<u16>,
    pub outstanding_alerts: u32,
    pub billing_total: f64,
    pub discharge_pending: bool,
}

impl From<&Patient> for FfiPatient {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            age: p.age,
            gender: format!("{:?}", p.gender),
            ward: p.ward.clone(),
            bed: p.bed.clone(),
            diagnosis: p.diagnosis.clone(),
            assigned_doctor: p.assigned_doctor.clone(),
            status: p.status.label().to_string(),
            vitals: p.vitals.into(),
            vitals_warning: vitals::assess(&p.vitals).any_warning(),
            heart_rate_history: p.history.heart_rate_series(),
            spo2_history: p.history.spo2_series(),
            outstanding_alerts: u32::try_from(p.unacknowledged_alerts().count()).unwrap_or(u32::MAX),
            billing_total: p.billing_total(),
            discharge_pending: p.discharge_request.is_pending(),
        }
    }
}

/// FFI-safe admission form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAdmission {
    pub name: String,
    pub age: u32,
    /// "Male", "Female" or "Other"
    pub gender: String,
    pub ward: String,
    pub bed: Option<String>,
    pub diagnosis: Option<String>,
    pub assigned_doctor: Option<String>,
}

impl TryFrom<FfiAdmission> for AdmissionRequest {
    type Error = PulseguardError;

    fn try_from(a: FfiAdmission) -> Result<Self, Self::Error> {
        if a.name.trim().is_empty() {
            return Err(PulseguardError::InvalidInput("name is required".into()));
        }
        let gender = match a.gender.to_ascii_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            "other" => Gender::Other,
            other => {
                return Err(PulseguardError::InvalidInput(format!(
                    "unknown gender: {}",
                    other
                )))
            }
        };
        Ok(AdmissionRequest {
            name: a.name,
            age: a.age,
            gender,
            ward: a.ward,
            bed: a.bed,
            diagnosis: a.diagnosis,
            assigned_doctor: a.assigned_doctor,
        })
    }
}

/// FFI-safe transition result.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiTransition {
    pub applied: bool,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub rejection: Option<String>,
}

impl From<TransitionOutcome> for FfiTransition {
    fn from(outcome: TransitionOutcome) -> Self {
        match outcome {
            TransitionOutcome::Applied { from, to } => Self {
                applied: true,
                from_status: Some(from.label().to_string()),
                to_status: Some(to.label().to_string()),
                rejection: None,
            },
            TransitionOutcome::Rejected(r) => Self {
                applied: false,
                from_status: None,
                to_status: None,
                rejection: Some(r.to_string()),
            },
        }
    }
}

/// FFI-safe escalation state.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiEscalation {
    /// "sending", "sent", "connecting", "ringing", "connected" or "ended"
    pub phase: String,
    pub call_seconds: u32,
}

/// FFI-safe sync update.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiSyncUpdate {
    pub patient_id: String,
    pub vitals: Option<FfiVitals>,
    pub medication_id: Option<String>,
    pub medication_status: Option<String>,
}

impl From<SyncMessage> for FfiSyncUpdate {
    fn from(message: SyncMessage) -> Self {
        match message {
            SyncMessage::VitalsUpdate { patient_id, vitals } => Self {
                patient_id,
                vitals: Some(vitals.into()),
                medication_id: None,
                medication_status: None,
            },
            SyncMessage::MedicationUpdate {
                patient_id,
                medication_id,
                status,
            } => Self {
                patient_id,
                vitals: None,
                medication_id: Some(medication_id),
                medication_status: Some(format!("{:?}", status).to_lowercase()),
            },
        }
    }
}

/// FFI-safe network indicator.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiNetworkState {
    pub connected: bool,
    pub latency_ms: u32,
    pub last_sync_ms: u64,
}
