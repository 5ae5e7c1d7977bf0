//! Clinical status transitions.
//!
//! ```text
//!   Stable ──┐
//!   Warning ─┼── escalate ──▶ Critical ── acknowledge ──▶ Warning
//!   UnderCare┘                   │
//!                                └── place under care ──▶ UnderCare
//!
//!   Stable / Warning / UnderCare ── request ──▶ PendingDischarge
//!   PendingDischarge ── approve ──▶ Discharged (terminal)
//!   PendingDischarge ── reject ───▶ prior status
//! ```
//!
//! Every transition checks its preconditions and reports a
//! [`TransitionOutcome`] instead of failing.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::models::{AlertSeverity, DischargeRequest, Patient, PatientStatus};

/// Why a transition was not applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransitionRejection {
    /// The patient is discharged
    Terminal,
    /// The patient already has the target status
    AlreadyInStatus(PatientStatus),
    /// The action requires a critical patient
    NotCritical(PatientStatus),
    /// Discharge cannot be requested from this status
    NotEligibleForDischarge(PatientStatus),
    DischargeAlreadyPending,
    NoPendingDischarge,
    /// An escalate-to-doctor sequence is already running
    EscalationInProgress,
    NoActiveCall,
}

impl std::fmt::Display for TransitionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionRejection::Terminal => write!(f, "patient is discharged"),
            TransitionRejection::AlreadyInStatus(s) => write!(f, "patient is already {}", s),
            TransitionRejection::NotCritical(s) => write!(f, "patient is {}, not Critical", s),
            TransitionRejection::NotEligibleForDischarge(s) => {
                write!(f, "discharge cannot be requested while {}", s)
            }
            TransitionRejection::DischargeAlreadyPending => {
                write!(f, "a discharge request is already pending")
            }
            TransitionRejection::NoPendingDischarge => write!(f, "no discharge request is pending"),
            TransitionRejection::EscalationInProgress => {
                write!(f, "an escalation is already in progress")
            }
            TransitionRejection::NoActiveCall => write!(f, "no call is active"),
        }
    }
}

/// Result of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied {
        from: PatientStatus,
        to: PatientStatus,
    },
    Rejected(TransitionRejection),
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }

    pub fn rejection(&self) -> Option<TransitionRejection> {
        match self {
            TransitionOutcome::Rejected(r) => Some(*r),
            TransitionOutcome::Applied { .. } => None,
        }
    }
}

/// Set the status and log the change.
pub(crate) fn apply(patient: &mut Patient, to: PatientStatus) -> TransitionOutcome {
    let from = patient.status;
    patient.status = to;
    info!("Patient {} status {} -> {}", patient.id, from, to);
    TransitionOutcome::Applied { from, to }
}

pub(crate) fn reject(patient: &Patient, rejection: TransitionRejection) -> TransitionOutcome {
    warn!("Patient {}: transition rejected ({})", patient.id, rejection);
    TransitionOutcome::Rejected(rejection)
}

/// Emergency trigger: any non-discharged patient becomes Critical.
///
/// Raises a high-severity alert and withdraws a pending discharge request.
pub fn escalate_to_critical(patient: &mut Patient) -> TransitionOutcome {
    match patient.status {
        PatientStatus::Discharged => reject(patient, TransitionRejection::Terminal),
        PatientStatus::Critical => reject(
            patient,
            TransitionRejection::AlreadyInStatus(PatientStatus::Critical),
        ),
        _ => {
            if patient.discharge_request.is_pending() {
                patient.discharge_request = DischargeRequest::default();
            }
            patient.raise_alert("Critical condition reported", AlertSeverity::High);
            apply(patient, PatientStatus::Critical)
        }
    }
}

/// Nurse acknowledgement: Critical becomes Warning and outstanding alerts
/// are acknowledged.
pub fn acknowledge_critical(patient: &mut Patient) -> TransitionOutcome {
    match patient.status {
        PatientStatus::Critical => {
            patient.acknowledge_all_alerts();
            apply(patient, PatientStatus::Warning)
        }
        PatientStatus::Discharged => reject(patient, TransitionRejection::Terminal),
        other => reject(patient, TransitionRejection::NotCritical(other)),
    }
}

/// Doctor takes over care of a Warning or Critical patient.
pub fn place_under_care(patient: &mut Patient) -> TransitionOutcome {
    match patient.status {
        PatientStatus::Warning | PatientStatus::Critical => {
            apply(patient, PatientStatus::UnderCare)
        }
        PatientStatus::Discharged => reject(patient, TransitionRejection::Terminal),
        PatientStatus::UnderCare => reject(
            patient,
            TransitionRejection::AlreadyInStatus(PatientStatus::UnderCare),
        ),
        other => reject(patient, TransitionRejection::NotCritical(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DischargeState, Gender};

    fn setup_patient(status: PatientStatus) -> Patient {
        let mut patient = Patient::new(
            "p1".into(),
            "James Wilson".into(),
            65,
            Gender::Male,
            "ICU-A".into(),
        );
        patient.status = status;
        patient
    }

    #[test]
    fn test_escalate_from_any_active_status() {
        for status in [
            PatientStatus::Stable,
            PatientStatus::Warning,
            PatientStatus::UnderCare,
            PatientStatus::PendingDischarge,
        ] {
            let mut patient = setup_patient(status);
            let outcome = escalate_to_critical(&mut patient);
            assert_eq!(
                outcome,
                TransitionOutcome::Applied {
                    from: status,
                    to: PatientStatus::Critical
                }
            );
            assert_eq!(
                patient.highest_outstanding_severity(),
                Some(AlertSeverity::High)
            );
        }
    }

    #[test]
    fn test_escalate_withdraws_pending_discharge() {
        let mut patient = setup_patient(PatientStatus::PendingDischarge);
        patient.discharge_request = DischargeRequest::open(None, PatientStatus::Stable);

        escalate_to_critical(&mut patient);
        assert_eq!(patient.discharge_request.state, DischargeState::None);
    }

    #[test]
    fn test_escalate_rejections() {
        let mut discharged = setup_patient(PatientStatus::Discharged);
        assert_eq!(
            escalate_to_critical(&mut discharged).rejection(),
            Some(TransitionRejection::Terminal)
        );
        assert!(discharged.alerts.is_empty());

        let mut critical = setup_patient(PatientStatus::Critical);
        assert_eq!(
            escalate_to_critical(&mut critical).rejection(),
            Some(TransitionRejection::AlreadyInStatus(PatientStatus::Critical))
        );
    }

    #[test]
    fn test_acknowledge_critical() {
        let mut patient = setup_patient(PatientStatus::Stable);
        escalate_to_critical(&mut patient);

        let outcome = acknowledge_critical(&mut patient);
        assert!(outcome.is_applied());
        assert_eq!(patient.status, PatientStatus::Warning);
        assert_eq!(patient.unacknowledged_alerts().count(), 0);

        assert_eq!(
            acknowledge_critical(&mut patient).rejection(),
            Some(TransitionRejection::NotCritical(PatientStatus::Warning))
        );
    }

    #[test]
    fn test_place_under_care() {
        let mut patient = setup_patient(PatientStatus::Critical);
        assert!(place_under_care(&mut patient).is_applied());
        assert_eq!(patient.status, PatientStatus::UnderCare);

        let mut stable = setup_patient(PatientStatus::Stable);
        assert!(!place_under_care(&mut stable).is_applied());
        assert_eq!(stable.status, PatientStatus::Stable);
    }
}
