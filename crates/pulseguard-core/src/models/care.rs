//! Alerts, medications, billing and reports attached to a patient.

use serde::{Deserialize, Serialize};

/// Alert severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

/// A clinical alert. Alerts are append-only until acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    /// Unique alert ID
    pub id: String,
    /// Human-readable message
    pub message: String,
    /// Severity
    pub severity: AlertSeverity,
    /// Raise timestamp (RFC 3339)
    pub timestamp: String,
    /// Whether a clinician has acknowledged it
    pub acknowledged: bool,
}

impl Alert {
    pub fn new(message: impl Into<String>, severity: AlertSeverity) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message: message.into(),
            severity,
            timestamp: chrono::Utc::now().to_rfc3339(),
            acknowledged: false,
        }
    }
}

/// Scheduled slot for a medication.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Adherence state of a medication dose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    Taken,
    Missed,
    Upcoming,
}

/// A prescribed medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// Unique medication ID
    pub id: String,
    /// Drug name
    pub name: String,
    /// Dosage (e.g., "10mg")
    pub dosage: String,
    /// Frequency (e.g., "Once daily")
    pub frequency: String,
    /// Slot in the daily schedule
    pub time_of_day: TimeOfDay,
    /// Adherence state
    pub status: MedicationStatus,
    /// Patient-facing instructions
    pub instructions: Option<String>,
}

/// A billable charge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillItem {
    /// Unique bill item ID
    pub id: String,
    /// Charge description
    pub description: String,
    /// Cost in the facility's currency
    pub cost: f64,
    /// Charge timestamp (RFC 3339)
    pub timestamp: String,
}

impl BillItem {
    pub fn new(description: impl Into<String>, cost: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            cost,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Common ward charges offered as presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargePreset {
    IcuNight,
    GeneralWardNight,
    OxygenTherapyHour,
    BloodTestPanel,
    MriScan,
    DoctorConsultation,
}

impl ChargePreset {
    pub const ALL: [ChargePreset; 6] = [
        ChargePreset::IcuNight,
        ChargePreset::GeneralWardNight,
        ChargePreset::OxygenTherapyHour,
        ChargePreset::BloodTestPanel,
        ChargePreset::MriScan,
        ChargePreset::DoctorConsultation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ChargePreset::IcuNight => "ICU Night Charge",
            ChargePreset::GeneralWardNight => "General Ward Night",
            ChargePreset::OxygenTherapyHour => "Oxygen Therapy (1hr)",
            ChargePreset::BloodTestPanel => "Blood Test Panel",
            ChargePreset::MriScan => "MRI Scan",
            ChargePreset::DoctorConsultation => "Doctor Consultation",
        }
    }

    pub fn cost(&self) -> f64 {
        match self {
            ChargePreset::IcuNight => 1200.0,
            ChargePreset::GeneralWardNight => 400.0,
            ChargePreset::OxygenTherapyHour => 50.0,
            ChargePreset::BloodTestPanel => 200.0,
            ChargePreset::MriScan => 800.0,
            ChargePreset::DoctorConsultation => 150.0,
        }
    }
}

/// Kind of clinical report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportKind {
    Lab,
    Imaging,
    Prescription,
    Discharge,
}

/// Availability of a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportStatus {
    Ready,
    Processing,
}

/// A clinical report visible to the patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: String,
    pub title: String,
    /// Report date (YYYY-MM-DD)
    pub date: String,
    pub kind: ReportKind,
    pub doctor: String,
    pub status: ReportStatus,
}
