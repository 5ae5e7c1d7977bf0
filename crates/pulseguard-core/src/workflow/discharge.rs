//! Discharge sub-machine and pluggable approval decisions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::status::{apply, reject, TransitionOutcome, TransitionRejection};
use crate::models::{DischargeRequest, DischargeState, Patient, PatientStatus};

/// Probability of approval used by the demo decider.
pub const DEFAULT_APPROVE_PROBABILITY: f64 = 0.8;

/// Open a discharge request for a Stable, Warning or Under Care patient.
pub fn request_discharge(patient: &mut Patient, note: Option<String>) -> TransitionOutcome {
    match patient.status {
        PatientStatus::Discharged => reject(patient, TransitionRejection::Terminal),
        _ if patient.discharge_request.is_pending() => {
            reject(patient, TransitionRejection::DischargeAlreadyPending)
        }
        PatientStatus::Stable | PatientStatus::Warning | PatientStatus::UnderCare => {
            patient.discharge_request = DischargeRequest::open(note, patient.status);
            apply(patient, PatientStatus::PendingDischarge)
        }
        other => reject(patient, TransitionRejection::NotEligibleForDischarge(other)),
    }
}

/// Approve the pending request. The patient becomes Discharged.
pub fn approve_discharge(patient: &mut Patient) -> TransitionOutcome {
    if patient.status.is_terminal() {
        return reject(patient, TransitionRejection::Terminal);
    }
    if !patient.discharge_request.is_pending() {
        return reject(patient, TransitionRejection::NoPendingDischarge);
    }
    patient
        .discharge_request
        .respond(DischargeState::Approved, None);
    apply(patient, PatientStatus::Discharged)
}

/// Reject the pending request, restoring the status held when it was made.
pub fn reject_discharge(patient: &mut Patient, reason: Option<String>) -> TransitionOutcome {
    if patient.status.is_terminal() {
        return reject(patient, TransitionRejection::Terminal);
    }
    if !patient.discharge_request.is_pending() {
        return reject(patient, TransitionRejection::NoPendingDischarge);
    }
    let restored = patient
        .discharge_request
        .prior_status
        .unwrap_or(PatientStatus::Stable);
    patient
        .discharge_request
        .respond(DischargeState::Rejected, reason);
    apply(patient, restored)
}

/// A doctor's answer to a pending discharge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DischargeDecision {
    Approve,
    Reject { reason: Option<String> },
}

/// Apply a decision to the patient's pending request.
pub fn resolve_discharge(patient: &mut Patient, decision: DischargeDecision) -> TransitionOutcome {
    match decision {
        DischargeDecision::Approve => approve_discharge(patient),
        DischargeDecision::Reject { reason } => reject_discharge(patient, reason),
    }
}

/// Strategy deciding pending discharge requests.
pub trait DischargeDecider: Send {
    fn decide(&mut self, patient: &Patient) -> DischargeDecision;
}

/// Approves every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

impl DischargeDecider for AlwaysApprove {
    fn decide(&mut self, _patient: &Patient) -> DischargeDecision {
        DischargeDecision::Approve
    }
}

/// Rejects every request with a fixed reason.
#[derive(Debug, Clone, Default)]
pub struct AlwaysReject {
    pub reason: Option<String>,
}

impl DischargeDecider for AlwaysReject {
    fn decide(&mut self, _patient: &Patient) -> DischargeDecision {
        DischargeDecision::Reject {
            reason: self.reason.clone(),
        }
    }
}

/// Approves with a fixed probability.
pub struct WeightedRandomDecider<R: Rng = ChaCha8Rng> {
    approve_probability: f64,
    rng: R,
}

impl WeightedRandomDecider<ChaCha8Rng> {
    pub fn seeded(approve_probability: f64, seed: u64) -> Self {
        Self::with_rng(approve_probability, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy(approve_probability: f64) -> Self {
        Self::with_rng(approve_probability, ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> WeightedRandomDecider<R> {
    /// Probabilities outside [0, 1] are clamped; NaN never approves.
    pub fn with_rng(approve_probability: f64, rng: R) -> Self {
        let approve_probability = if approve_probability.is_nan() {
            0.0
        } else {
            approve_probability.clamp(0.0, 1.0)
        };
        Self {
            approve_probability,
            rng,
        }
    }

    pub fn approve_probability(&self) -> f64 {
        self.approve_probability
    }
}

impl<R: Rng + Send> DischargeDecider for WeightedRandomDecider<R> {
    fn decide(&mut self, _patient: &Patient) -> DischargeDecision {
        if self.rng.gen_bool(self.approve_probability) {
            DischargeDecision::Approve
        } else {
            DischargeDecision::Reject {
                reason: Some("Doctor requested further observation".into()),
            }
        }
    }
}
