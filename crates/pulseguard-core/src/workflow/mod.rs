//! Clinical status state machine, discharge workflow and escalation.

mod discharge;
mod escalation;
mod status;

pub use discharge::{
    approve_discharge, reject_discharge, request_discharge, resolve_discharge, AlwaysApprove,
    AlwaysReject, DischargeDecider, DischargeDecision, WeightedRandomDecider,
    DEFAULT_APPROVE_PROBABILITY,
};
pub use escalation::{CallState, CallSummary, Escalation, EscalationPhase, EscalationTracker};
pub use status::{
    acknowledge_critical, escalate_to_critical, place_under_care, TransitionOutcome,
    TransitionRejection,
};
