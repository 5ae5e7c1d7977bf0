//! Discharge request sub-state.

use serde::{Deserialize, Serialize};

use super::patient::PatientStatus;

/// State of a patient's discharge request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DischargeState {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

/// Discharge workflow record. At most one request is pending at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DischargeRequest {
    /// Current state
    pub state: DischargeState,
    /// Request note or rejection reason
    pub note: Option<String>,
    /// When the request was made (RFC 3339)
    pub requested_at: Option<String>,
    /// When the doctor responded (RFC 3339)
    pub responded_at: Option<String>,
    /// Clinical status to restore if the request is rejected
    pub prior_status: Option<PatientStatus>,
}

impl DischargeRequest {
    pub fn is_pending(&self) -> bool {
        self.state == DischargeState::Pending
    }

    /// Open a new pending request.
    pub(crate) fn open(note: Option<String>, prior_status: PatientStatus) -> Self {
        Self {
            state: DischargeState::Pending,
            note,
            requested_at: Some(chrono::Utc::now().to_rfc3339()),
            responded_at: None,
            prior_status: Some(prior_status),
        }
    }

    /// Record a doctor response, keeping the original request metadata.
    pub(crate) fn respond(&mut self, state: DischargeState, note: Option<String>) {
        self.state = state;
        if note.is_some() {
            self.note = note;
        }
        self.responded_at = Some(chrono::Utc::now().to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_none() {
        let request = DischargeRequest::default();
        assert_eq!(request.state, DischargeState::None);
        assert!(!request.is_pending());
    }

    #[test]
    fn test_open_and_respond() {
        let mut request = DischargeRequest::open(Some("Ready to go home".into()), PatientStatus::Stable);
        assert!(request.is_pending());
        assert!(request.requested_at.is_some());
        assert_eq!(request.prior_status, Some(PatientStatus::Stable));

        request.respond(DischargeState::Rejected, Some("Needs monitoring".into()));
        assert_eq!(request.state, DischargeState::Rejected);
        assert_eq!(request.note.as_deref(), Some("Needs monitoring"));
        assert!(request.responded_at.is_some());
    }
}
