//! The simulation loop: store, generator, sync channel and timers.
//!
//! ```text
//!   Scheduler ──VitalsTick──▶ generator ──▶ store.record_vitals ──▶ channel.publish
//!       │                                         │
//!       ├──NetworkTick──▶ NetworkMonitor          └──▶ sink.save_patients (once per tick)
//!       ├──DischargeDecision──▶ decider ──▶ resolve_discharge
//!       └──EscalationStep / CallSecond──▶ EscalationTracker
//! ```
//!
//! Everything runs on the caller's thread. Jobs execute one at a time from
//! [`Simulation::run_due`], so a tick's compute, write and publish never
//! interleave with another job.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::clock::{Clock, SystemClock, VirtualClock};
use super::network::NetworkMonitor;
use super::scheduler::{Scheduler, TimerId};
use crate::config::SimulationConfig;
use crate::db::PatientSink;
use crate::models::{
    AlertSeverity, MedicationStatus, Patient, PatientId, PatientStatus, SimulationState,
};
use crate::store::{AdmissionRequest, PatientStore, StoreError, StoreResult};
use crate::sync::SyncChannel;
use crate::vitals::VitalsGenerator;
use crate::workflow::{
    self, CallState, CallSummary, DischargeDecider, Escalation, EscalationPhase,
    EscalationTracker, TransitionOutcome, TransitionRejection, WeightedRandomDecider,
};

/// Offsets the decider's stream from the generator's when seeded.
const DECIDER_SEED_OFFSET: u64 = 0x5eed;

const CALL_SECOND_MS: u64 = 1000;

/// Handle to a running vitals driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(u64);

impl DriverId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Parameters of a vitals driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSpec {
    pub interval_ms: u64,
    /// Patient whose updates are published; every ticked patient when `None`
    pub observed: Option<PatientId>,
}

impl DriverSpec {
    /// Ward-wide driver publishing every patient.
    pub fn ward(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            observed: None,
        }
    }

    /// Driver publishing a single patient, as a patient view does.
    pub fn observing(interval_ms: u64, patient_id: impl Into<PatientId>) -> Self {
        Self {
            interval_ms,
            observed: Some(patient_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Job {
    VitalsTick(DriverId),
    NetworkTick,
    DischargeDecision(PatientId),
    EscalationStep(PatientId),
    CallSecond(PatientId),
}

struct Driver {
    spec: DriverSpec,
    timer: TimerId,
}

/// Summary of one vitals tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub updated: Vec<PatientId>,
    pub published: usize,
}

pub struct Simulation {
    config: SimulationConfig,
    clock: Arc<dyn Clock>,
    virtual_clock: Option<VirtualClock>,
    store: PatientStore,
    channel: SyncChannel,
    scheduler: Scheduler<Job>,
    generator: VitalsGenerator,
    decider: Box<dyn DischargeDecider>,
    escalations: EscalationTracker,
    network: NetworkMonitor,
    sink: Option<Box<dyn PatientSink>>,
    drivers: HashMap<DriverId, Driver>,
    next_driver: u64,
    network_timer: Option<TimerId>,
    discharge_timers: HashMap<PatientId, TimerId>,
    escalation_timers: HashMap<PatientId, TimerId>,
    persisted_revision: u64,
    last_tick: Option<TickReport>,
}

impl Simulation {
    /// Simulation driven by a manually advanced clock.
    pub fn virtual_time(config: SimulationConfig, store: PatientStore) -> Self {
        let clock = VirtualClock::new();
        let mut sim = Self::with_clock(config, store, Arc::new(clock.clone()));
        sim.virtual_clock = Some(clock);
        sim
    }

    /// Simulation driven by wall-clock time.
    pub fn real_time(config: SimulationConfig, store: PatientStore) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: SimulationConfig, store: PatientStore, clock: Arc<dyn Clock>) -> Self {
        let (generator, decider) = match config.rng_seed {
            Some(seed) => (
                VitalsGenerator::seeded(seed),
                WeightedRandomDecider::with_rng(
                    config.discharge_approve_probability,
                    ChaCha8Rng::seed_from_u64(seed.wrapping_add(DECIDER_SEED_OFFSET)),
                ),
            ),
            None => (
                VitalsGenerator::from_entropy(),
                WeightedRandomDecider::from_entropy(config.discharge_approve_probability),
            ),
        };
        let network = NetworkMonitor::new(config.network_latency_min_ms, config.network_latency_max_ms);
        let persisted_revision = store.revision();

        Self {
            config,
            clock,
            virtual_clock: None,
            store,
            channel: SyncChannel::default(),
            scheduler: Scheduler::new(),
            generator,
            decider: Box::new(decider),
            escalations: EscalationTracker::new(),
            network,
            sink: None,
            drivers: HashMap::new(),
            next_driver: 1,
            network_timer: None,
            discharge_timers: HashMap::new(),
            escalation_timers: HashMap::new(),
            persisted_revision,
            last_tick: None,
        }
    }

    /// Replace the discharge decision strategy.
    pub fn with_decider(mut self, decider: Box<dyn DischargeDecider>) -> Self {
        self.decider = decider;
        self
    }

    /// Persist the patient list to `sink` whenever it changes.
    pub fn with_sink(mut self, sink: Box<dyn PatientSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Publish on an existing channel instead of a private one.
    pub fn with_channel(mut self, channel: SyncChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn store(&self) -> &PatientStore {
        &self.store
    }

    pub fn channel(&self) -> &SyncChannel {
        &self.channel
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn network_state(&self) -> SimulationState {
        self.network.state()
    }

    pub fn last_tick(&self) -> Option<&TickReport> {
        self.last_tick.as_ref()
    }

    // ------------------------------------------------------------------
    // Drivers
    // ------------------------------------------------------------------

    /// Start a periodic vitals driver. The first tick is one interval away.
    pub fn start_vitals_driver(&mut self, spec: DriverSpec) -> DriverId {
        let id = DriverId(self.next_driver);
        self.next_driver += 1;

        let timer = self
            .scheduler
            .every(self.clock.now_ms(), spec.interval_ms, Job::VitalsTick(id));
        info!(
            "Started vitals driver {} every {}ms (observing {})",
            id.0,
            spec.interval_ms,
            spec.observed.as_deref().unwrap_or("all")
        );
        self.drivers.insert(id, Driver { spec, timer });
        id
    }

    /// Start a driver at the configured cadence: the view interval when a
    /// patient is observed, the ward interval otherwise.
    pub fn start_default_driver(&mut self, observed: Option<PatientId>) -> DriverId {
        let interval_ms = self.config.driver_interval_ms(observed.is_some());
        self.start_vitals_driver(DriverSpec {
            interval_ms,
            observed,
        })
    }

    /// Stop a driver. No further ticks fire for it.
    pub fn stop_driver(&mut self, id: DriverId) -> bool {
        match self.drivers.remove(&id) {
            Some(driver) => {
                self.scheduler.cancel(driver.timer);
                info!("Stopped vitals driver {}", id.0);
                true
            }
            None => false,
        }
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn driver_ids(&self) -> Vec<DriverId> {
        self.drivers.keys().copied().collect()
    }

    /// Start the network-quality indicator. Idempotent.
    pub fn start_network_monitor(&mut self) {
        if self.network_timer.is_none() {
            let timer = self.scheduler.every(
                self.clock.now_ms(),
                self.config.network_interval_ms,
                Job::NetworkTick,
            );
            self.network_timer = Some(timer);
        }
        self.network.set_connected(true);
    }

    /// Stop the indicator. It reports disconnected until restarted.
    pub fn stop_network_monitor(&mut self) {
        if let Some(timer) = self.network_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.network.set_connected(false);
    }

    /// Run every job due at the current clock time. Returns how many ran.
    pub fn run_due(&mut self) -> usize {
        let mut ran = 0;
        while let Some((_, job)) = self.scheduler.pop_due(self.clock.now_ms()) {
            self.dispatch(job);
            ran += 1;
        }
        ran
    }

    /// Advance virtual time by `ms`, running jobs at their due times.
    ///
    /// With a wall clock this only runs what is already due.
    pub fn advance(&mut self, ms: u64) -> usize {
        let Some(clock) = self.virtual_clock.clone() else {
            return self.run_due();
        };

        let target = clock.now_ms().saturating_add(ms);
        let mut ran = 0;
        while let Some(due) = self.scheduler.next_due() {
            if due > target {
                break;
            }
            clock.set(due);
            ran += self.run_due();
        }
        clock.set(target);
        ran + self.run_due()
    }

    /// Cancel every timer, close the channel and write a final snapshot.
    pub fn shutdown(&mut self) {
        self.scheduler.clear();
        self.drivers.clear();
        self.network_timer = None;
        self.network.set_connected(false);
        self.discharge_timers.clear();
        self.escalation_timers.clear();
        self.escalations.clear();
        self.channel.close();
        self.persist_if_changed();
        info!("Simulation shut down");
    }

    fn dispatch(&mut self, job: Job) {
        match job {
            Job::VitalsTick(id) => self.vitals_tick(id),
            Job::NetworkTick => {
                let now = self.clock.now_ms();
                let state = self.network.tick(self.generator.rng_mut(), now);
                debug!("Network latency {}ms", state.latency_ms);
            }
            Job::DischargeDecision(patient_id) => self.decide_discharge(&patient_id),
            Job::EscalationStep(patient_id) => self.escalation_step(&patient_id),
            Job::CallSecond(patient_id) => {
                self.escalations.tick_call_second(&patient_id);
            }
        }
    }

    fn vitals_tick(&mut self, id: DriverId) {
        let Some(observed) = self.drivers.get(&id).map(|d| d.spec.observed.clone()) else {
            return;
        };
        let recorded_at = chrono::Utc::now().to_rfc3339();
        let mut report = TickReport::default();

        for patient in self.store.snapshot() {
            if !patient.is_active() {
                continue;
            }
            let next = self.generator.next(&patient.vitals, patient.status);
            match self.store.record_vitals(&patient.id, next, recorded_at.clone()) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!("Vitals tick skipped {}: {}", patient.id, e);
                    continue;
                }
            }
            if observed.as_deref().map_or(true, |o| o == patient.id) {
                report.published += self.channel.publish_vitals(&patient.id, next);
            }
            report.updated.push(patient.id.clone());
        }

        debug!(
            "Driver {} tick: {} updated, {} delivered",
            id.0,
            report.updated.len(),
            report.published
        );
        if !report.updated.is_empty() {
            self.persist_if_changed();
        }
        self.last_tick = Some(report);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the full patient list to the sink.
    pub fn persist(&mut self) -> StoreResult<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.save_patients(&self.config.storage_key, &self.store.to_vec())
                .map_err(StoreError::from)?;
        }
        self.persisted_revision = self.store.revision();
        Ok(())
    }

    fn persist_if_changed(&mut self) {
        if self.store.revision() == self.persisted_revision {
            return;
        }
        if let Err(e) = self.persist() {
            warn!("Failed to persist patients: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Clinical actions
    // ------------------------------------------------------------------

    pub fn admit(&mut self, request: AdmissionRequest) -> PatientId {
        let id = self.store.admit(request);
        self.persist_if_changed();
        id
    }

    pub fn patient(&self, id: &str) -> Option<Arc<Patient>> {
        self.store.get(id)
    }

    fn transition(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Patient) -> TransitionOutcome,
    ) -> StoreResult<TransitionOutcome> {
        let outcome = self.store.update(id, f)?;
        if outcome.is_applied() {
            self.persist_if_changed();
        }
        Ok(outcome)
    }

    /// Emergency trigger. Withdraws a scheduled discharge decision.
    pub fn escalate_to_critical(&mut self, id: &str) -> StoreResult<TransitionOutcome> {
        let outcome = self.transition(id, workflow::escalate_to_critical)?;
        if outcome.is_applied() {
            self.cancel_discharge_timer(id);
        }
        Ok(outcome)
    }

    pub fn acknowledge_critical(&mut self, id: &str) -> StoreResult<TransitionOutcome> {
        self.transition(id, workflow::acknowledge_critical)
    }

    pub fn place_under_care(&mut self, id: &str) -> StoreResult<TransitionOutcome> {
        self.transition(id, workflow::place_under_care)
    }

    /// Request discharge; the decider answers after the configured delay.
    pub fn request_discharge(&mut self, id: &str, note: Option<String>) -> StoreResult<TransitionOutcome> {
        let outcome = self.transition(id, |p| workflow::request_discharge(p, note))?;
        if outcome.is_applied() {
            let timer = self.scheduler.after(
                self.clock.now_ms(),
                self.config.discharge_decision_delay_ms,
                Job::DischargeDecision(id.to_string()),
            );
            self.discharge_timers.insert(id.to_string(), timer);
        }
        Ok(outcome)
    }

    /// Doctor approval, ahead of the scheduled decision.
    pub fn approve_discharge(&mut self, id: &str) -> StoreResult<TransitionOutcome> {
        let outcome = self.transition(id, workflow::approve_discharge)?;
        if outcome.is_applied() {
            self.on_discharged(id);
        }
        Ok(outcome)
    }

    /// Doctor rejection, ahead of the scheduled decision.
    pub fn reject_discharge(&mut self, id: &str, reason: Option<String>) -> StoreResult<TransitionOutcome> {
        let outcome = self.transition(id, |p| workflow::reject_discharge(p, reason))?;
        if outcome.is_applied() {
            self.cancel_discharge_timer(id);
        }
        Ok(outcome)
    }

    fn decide_discharge(&mut self, id: &str) {
        self.discharge_timers.remove(id);
        let Some(patient) = self.store.get(id) else {
            return;
        };
        let decision = self.decider.decide(&patient);
        match self.transition(id, |p| workflow::resolve_discharge(p, decision)) {
            Ok(outcome) if patient_is_discharged(&outcome) => {
                self.on_discharged(id)
            }
            Ok(_) => {}
            Err(e) => warn!("Discharge decision for {} dropped: {}", id, e),
        }
    }

    fn on_discharged(&mut self, id: &str) {
        self.cancel_discharge_timer(id);
        self.cancel_escalation(id);
    }

    fn cancel_discharge_timer(&mut self, id: &str) {
        if let Some(timer) = self.discharge_timers.remove(id) {
            self.scheduler.cancel(timer);
        }
    }

    /// Start the escalate-to-doctor sequence for a critical patient.
    pub fn escalate_to_doctor(
        &mut self,
        id: &str,
    ) -> StoreResult<Result<EscalationPhase, TransitionRejection>> {
        let patient = self
            .store
            .get(id)
            .ok_or_else(|| StoreError::UnknownPatient(id.to_string()))?;
        let phase = match self.escalations.begin(&patient) {
            Ok(phase) => phase,
            Err(rejection) => return Ok(Err(rejection)),
        };
        self.schedule_escalation(id, phase);
        Ok(Ok(phase))
    }

    fn escalation_step(&mut self, id: &str) {
        self.escalation_timers.remove(id);
        if let Some(phase) = self.escalations.advance(id) {
            self.schedule_escalation(id, phase);
        }
    }

    fn schedule_escalation(&mut self, id: &str, phase: EscalationPhase) {
        let now = self.clock.now_ms();
        let timer = match phase {
            EscalationPhase::SendingMessage => self.scheduler.after(
                now,
                self.config.escalation_message_delay_ms,
                Job::EscalationStep(id.to_string()),
            ),
            EscalationPhase::AwaitingCall => self.scheduler.after(
                now,
                self.config.escalation_call_delay_ms,
                Job::EscalationStep(id.to_string()),
            ),
            EscalationPhase::Call(CallState::Connecting) => self.scheduler.after(
                now,
                self.config.call_connecting_ms,
                Job::EscalationStep(id.to_string()),
            ),
            EscalationPhase::Call(CallState::Ringing) => self.scheduler.after(
                now,
                self.config.call_ringing_ms,
                Job::EscalationStep(id.to_string()),
            ),
            EscalationPhase::Call(CallState::Connected) => {
                self.scheduler
                    .every(now, CALL_SECOND_MS, Job::CallSecond(id.to_string()))
            }
            EscalationPhase::Call(CallState::Ended) => return,
        };
        self.escalation_timers.insert(id.to_string(), timer);
    }

    /// Hang up the doctor's call. A critical patient moves to Warning.
    pub fn end_call(&mut self, id: &str) -> StoreResult<Result<CallSummary, TransitionRejection>> {
        let escalations = &mut self.escalations;
        let result = self.store.update(id, |p| escalations.end_call(p))?;
        if result.is_ok() {
            if let Some(timer) = self.escalation_timers.remove(id) {
                self.scheduler.cancel(timer);
            }
            self.persist_if_changed();
        }
        Ok(result)
    }

    fn cancel_escalation(&mut self, id: &str) {
        self.escalations.cancel(id);
        if let Some(timer) = self.escalation_timers.remove(id) {
            self.scheduler.cancel(timer);
        }
    }

    pub fn escalation(&self, id: &str) -> Option<Escalation> {
        self.escalations.get(id).copied()
    }

    pub fn add_charge(&mut self, id: &str, description: &str, cost: f64) -> StoreResult<Option<String>> {
        let bill_id = self.store.add_charge(id, description, cost)?;
        self.persist_if_changed();
        Ok(bill_id)
    }

    /// Record a dose and tell other views about it.
    pub fn mark_medication_taken(&mut self, id: &str, medication_id: &str) -> StoreResult<bool> {
        let changed = self.store.mark_medication_taken(id, medication_id)?;
        if changed {
            self.channel
                .publish_medication(id, medication_id, MedicationStatus::Taken);
            self.persist_if_changed();
        }
        Ok(changed)
    }

    pub fn raise_alert(&mut self, id: &str, message: &str, severity: AlertSeverity) -> StoreResult<String> {
        let alert_id = self.store.raise_alert(id, message, severity)?;
        self.persist_if_changed();
        Ok(alert_id)
    }

    pub fn acknowledge_alert(&mut self, id: &str, alert_id: &str) -> StoreResult<bool> {
        let changed = self.store.acknowledge_alert(id, alert_id)?;
        self.persist_if_changed();
        Ok(changed)
    }
}

fn patient_is_discharged(outcome: &TransitionOutcome) -> bool {
    matches!(
        outcome,
        TransitionOutcome::Applied {
            to: PatientStatus::Discharged,
            ..
        }
    )
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("now_ms", &self.clock.now_ms())
            .field("patients", &self.store.len())
            .field("drivers", &self.drivers.len())
            .field("timers", &self.scheduler.len())
            .finish()
    }
}
