//! Escalate-to-doctor sequence.
//!
//! A critical patient can be escalated: the message is sent, the doctor's
//! call comes in and walks through `connecting → ringing → connected`, and
//! ending the call moves the patient from Critical to Warning. Timing is
//! owned by the caller; the tracker only holds phases.

use std::collections::HashMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::status::{apply, reject, TransitionOutcome, TransitionRejection};
use crate::models::{Patient, PatientId, PatientStatus};

/// Sub-state of the doctor's call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Connecting,
    Ringing,
    Connected,
    Ended,
}

/// Phase of an escalation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EscalationPhase {
    /// Message to the doctor is being delivered
    SendingMessage,
    /// Message delivered, waiting for the call
    AwaitingCall,
    Call(CallState),
}

impl EscalationPhase {
    /// The phase that follows this one without user input.
    pub fn next(&self) -> Option<EscalationPhase> {
        match self {
            EscalationPhase::SendingMessage => Some(EscalationPhase::AwaitingCall),
            EscalationPhase::AwaitingCall => Some(EscalationPhase::Call(CallState::Connecting)),
            EscalationPhase::Call(CallState::Connecting) => {
                Some(EscalationPhase::Call(CallState::Ringing))
            }
            EscalationPhase::Call(CallState::Ringing) => {
                Some(EscalationPhase::Call(CallState::Connected))
            }
            EscalationPhase::Call(_) => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, EscalationPhase::Call(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            EscalationPhase::SendingMessage => "sending",
            EscalationPhase::AwaitingCall => "sent",
            EscalationPhase::Call(CallState::Connecting) => "connecting",
            EscalationPhase::Call(CallState::Ringing) => "ringing",
            EscalationPhase::Call(CallState::Connected) => "connected",
            EscalationPhase::Call(CallState::Ended) => "ended",
        }
    }
}

/// One patient's running escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation {
    pub phase: EscalationPhase,
    /// Seconds spent in the connected state
    pub call_seconds: u32,
}

/// Summary returned when a call ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSummary {
    pub call_seconds: u32,
    /// Status change applied to the patient
    pub outcome: TransitionOutcome,
}

/// Running escalations, at most one per patient.
#[derive(Debug, Default)]
pub struct EscalationTracker {
    active: HashMap<PatientId, Escalation>,
}

impl EscalationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start escalating a critical patient.
    pub fn begin(&mut self, patient: &Patient) -> Result<EscalationPhase, TransitionRejection> {
        if patient.status.is_terminal() {
            return Err(TransitionRejection::Terminal);
        }
        if patient.status != PatientStatus::Critical {
            return Err(TransitionRejection::NotCritical(patient.status));
        }
        if self.active.contains_key(&patient.id) {
            return Err(TransitionRejection::EscalationInProgress);
        }

        let phase = EscalationPhase::SendingMessage;
        self.active.insert(
            patient.id.clone(),
            Escalation {
                phase,
                call_seconds: 0,
            },
        );
        info!("Escalating patient {} to doctor", patient.id);
        Ok(phase)
    }

    /// Move to the next timed phase. Returns the new phase, or `None` when
    /// nothing is running or the call is already connected.
    pub fn advance(&mut self, patient_id: &str) -> Option<EscalationPhase> {
        let escalation = self.active.get_mut(patient_id)?;
        let next = escalation.phase.next()?;
        escalation.phase = next;
        debug!("Escalation for {} now {}", patient_id, next.label());
        Some(next)
    }

    /// Count one second of connected call time.
    pub fn tick_call_second(&mut self, patient_id: &str) -> Option<u32> {
        let escalation = self.active.get_mut(patient_id)?;
        if escalation.phase != EscalationPhase::Call(CallState::Connected) {
            return None;
        }
        escalation.call_seconds += 1;
        Some(escalation.call_seconds)
    }

    /// Hang up the call. A Critical patient is moved to Warning.
    ///
    /// Only valid once the call phase has started; the escalation is
    /// removed either way.
    pub fn end_call(&mut self, patient: &mut Patient) -> Result<CallSummary, TransitionRejection> {
        let escalation = match self.active.get(&patient.id) {
            Some(e) if e.phase.is_call() => *e,
            _ => return Err(TransitionRejection::NoActiveCall),
        };
        self.active.remove(&patient.id);
        info!(
            "Call for patient {} ended after {}s",
            patient.id, escalation.call_seconds
        );

        let outcome = match patient.status {
            PatientStatus::Critical => apply(patient, PatientStatus::Warning),
            PatientStatus::Discharged => reject(patient, TransitionRejection::Terminal),
            other => reject(patient, TransitionRejection::NotCritical(other)),
        };
        Ok(CallSummary {
            call_seconds: escalation.call_seconds,
            outcome,
        })
    }

    /// Drop an escalation without touching the patient.
    pub fn cancel(&mut self, patient_id: &str) -> bool {
        self.active.remove(patient_id).is_some()
    }

    pub fn get(&self, patient_id: &str) -> Option<&Escalation> {
        self.active.get(patient_id)
    }

    pub fn is_active(&self, patient_id: &str) -> bool {
        self.active.contains_key(patient_id)
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
