//! Patient models.

use serde::{Deserialize, Serialize};

use super::care::{Alert, AlertSeverity, BillItem, Medication, MedicationStatus, Report};
use super::discharge::DischargeRequest;
use super::vitals::{Vitals, VitalsHistory, VitalsSample};

/// Patient identifier (e.g., "p1"), unique within a store.
pub type PatientId = String;

/// Clinical status of an admitted patient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PatientStatus {
    Stable,
    Warning,
    Critical,
    #[serde(rename = "Under Care")]
    UnderCare,
    #[serde(rename = "Pending Discharge")]
    PendingDischarge,
    /// Terminal: no further transitions or vitals updates
    Discharged,
}

impl PatientStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PatientStatus::Discharged)
    }

    /// Whether the simulation still updates this patient's vitals.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Display label used by the dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            PatientStatus::Stable => "Stable",
            PatientStatus::Warning => "Warning",
            PatientStatus::Critical => "Critical",
            PatientStatus::UnderCare => "Under Care",
            PatientStatus::PendingDischarge => "Pending Discharge",
            PatientStatus::Discharged => "Discharged",
        }
    }
}

impl std::fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Patient gender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// An admitted patient. The record owns its vitals snapshot and history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Unique patient ID
    pub id: PatientId,
    /// Full name
    pub name: String,
    /// Age in years
    pub age: u32,
    /// Gender
    pub gender: Gender,
    /// Ward (e.g., "ICU-A")
    pub ward: String,
    /// Bed label within the ward
    pub bed: String,
    /// Working diagnosis
    pub diagnosis: Option<String>,
    /// Attending doctor
    pub assigned_doctor: String,
    /// Attending doctor's phone
    pub doctor_phone: Option<String>,
    /// Admission timestamp (RFC 3339)
    pub admitted_at: String,
    /// Clinical status
    pub status: PatientStatus,
    /// Current vitals snapshot
    pub vitals: Vitals,
    /// Sliding window of past snapshots
    #[serde(default)]
    pub history: VitalsHistory,
    /// Alerts, append-only until acknowledged
    #[serde(default)]
    pub alerts: Vec<Alert>,
    /// Prescribed medications
    #[serde(default)]
    pub medications: Vec<Medication>,
    /// Billable charges
    #[serde(default)]
    pub billing: Vec<BillItem>,
    /// Discharge workflow record
    #[serde(default)]
    pub discharge_request: DischargeRequest,
    /// Clinical reports
    #[serde(default)]
    pub reports: Vec<Report>,
}

impl Patient {
    /// Create a stable patient with admission-default vitals.
    pub fn new(id: PatientId, name: String, age: u32, gender: Gender, ward: String) -> Self {
        Self {
            id,
            name,
            age,
            gender,
            ward,
            bed: "Wait".into(),
            diagnosis: None,
            assigned_doctor: "Dr. OnCall".into(),
            doctor_phone: None,
            admitted_at: chrono::Utc::now().to_rfc3339(),
            status: PatientStatus::Stable,
            vitals: Vitals::admission_default(),
            history: VitalsHistory::default(),
            alerts: Vec::new(),
            medications: Vec::new(),
            billing: Vec::new(),
            discharge_request: DischargeRequest::default(),
            reports: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Replace the current snapshot and append it to the history window.
    pub fn record_vitals(&mut self, vitals: Vitals, recorded_at: String) {
        self.vitals = vitals;
        self.history.push(VitalsSample {
            recorded_at,
            vitals,
        });
    }

    /// Raise a new alert and return its ID.
    pub fn raise_alert(&mut self, message: impl Into<String>, severity: AlertSeverity) -> String {
        let alert = Alert::new(message, severity);
        let id = alert.id.clone();
        self.alerts.push(alert);
        id
    }

    /// Acknowledge one alert. Returns false if unknown or already acknowledged.
    pub fn acknowledge_alert(&mut self, alert_id: &str) -> bool {
        match self
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id && !a.acknowledged)
        {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Acknowledge every outstanding alert. Returns how many were acknowledged.
    pub fn acknowledge_all_alerts(&mut self) -> usize {
        let mut count = 0;
        for alert in self.alerts.iter_mut().filter(|a| !a.acknowledged) {
            alert.acknowledged = true;
            count += 1;
        }
        count
    }

    /// Drop acknowledged alerts. Returns how many were removed.
    pub fn clear_acknowledged_alerts(&mut self) -> usize {
        let before = self.alerts.len();
        self.alerts.retain(|a| !a.acknowledged);
        before - self.alerts.len()
    }

    pub fn unacknowledged_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| !a.acknowledged)
    }

    /// Highest severity among outstanding alerts.
    pub fn highest_outstanding_severity(&self) -> Option<AlertSeverity> {
        self.unacknowledged_alerts().map(|a| a.severity).max()
    }

    /// Add a charge. Non-positive or non-finite costs are refused.
    pub fn add_charge(&mut self, description: impl Into<String>, cost: f64) -> Option<String> {
        if !cost.is_finite() || cost <= 0.0 {
            return None;
        }
        let item = BillItem::new(description, cost);
        let id = item.id.clone();
        self.billing.push(item);
        Some(id)
    }

    pub fn billing_total(&self) -> f64 {
        self.billing.iter().map(|b| b.cost).sum()
    }

    /// Record a dose as taken. Returns false if unknown or already taken.
    pub fn mark_medication_taken(&mut self, medication_id: &str) -> bool {
        match self
            .medications
            .iter_mut()
            .find(|m| m.id == medication_id && m.status != MedicationStatus::Taken)
        {
            Some(medication) => {
                medication.status = MedicationStatus::Taken;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeOfDay;

    fn make_patient() -> Patient {
        Patient::new("p9".into(), "Ada Lovelace".into(), 36, Gender::Female, "Gen-A".into())
    }

    #[test]
    fn test_new_patient() {
        let patient = make_patient();
        assert_eq!(patient.status, PatientStatus::Stable);
        assert_eq!(patient.bed, "Wait");
        assert_eq!(patient.vitals, Vitals::admission_default());
        assert!(patient.history.is_empty());
        assert!(patient.is_active());
    }

    #[test]
    fn test_status_serialization_labels() {
        let json = serde_json::to_string(&PatientStatus::UnderCare).unwrap();
        assert_eq!(json, "\"Under Care\"");
        let parsed: PatientStatus = serde_json::from_str("\"Pending Discharge\"").unwrap();
        assert_eq!(parsed, PatientStatus::PendingDischarge);
    }

    #[test]
    fn test_record_vitals_appends_history() {
        let mut patient = make_patient();
        let vitals = Vitals {
            heart_rate: 90,
            ..Vitals::admission_default()
        };
        patient.record_vitals(vitals, "2024-01-15T10:00:00Z".into());

        assert_eq!(patient.vitals.heart_rate, 90);
        assert_eq!(patient.history.len(), 1);
    }

    #[test]
    fn test_alert_lifecycle() {
        let mut patient = make_patient();
        let first = patient.raise_alert("Elevated Heart Rate", AlertSeverity::Medium);
        patient.raise_alert("Low SpO2", AlertSeverity::High);

        assert_eq!(patient.highest_outstanding_severity(), Some(AlertSeverity::High));
        assert!(patient.acknowledge_alert(&first));
        assert!(!patient.acknowledge_alert(&first));
        assert_eq!(patient.unacknowledged_alerts().count(), 1);

        assert_eq!(patient.acknowledge_all_alerts(), 1);
        assert_eq!(patient.clear_acknowledged_alerts(), 2);
        assert!(patient.alerts.is_empty());
    }

    #[test]
    fn test_add_charge_rejects_bad_cost() {
        let mut patient = make_patient();
        assert!(patient.add_charge("MRI Scan", 800.0).is_some());
        assert!(patient.add_charge("Free lunch", 0.0).is_none());
        assert!(patient.add_charge("Broken", f64::NAN).is_none());
        assert_eq!(patient.billing_total(), 800.0);
    }

    #[test]
    fn test_mark_medication_taken() {
        let mut patient = make_patient();
        patient.medications.push(Medication {
            id: "m1".into(),
            name: "Lisinopril".into(),
            dosage: "10mg".into(),
            frequency: "Once daily".into(),
            time_of_day: TimeOfDay::Morning,
            status: MedicationStatus::Upcoming,
            instructions: None,
        });

        assert!(patient.mark_medication_taken("m1"));
        assert!(!patient.mark_medication_taken("m1"));
        assert!(!patient.mark_medication_taken("missing"));
        assert_eq!(patient.medications[0].status, MedicationStatus::Taken);
    }
}
