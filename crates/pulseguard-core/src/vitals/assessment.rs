//! Per-reading normal/warning flags, as highlighted on the vital cards.

use serde::{Deserialize, Serialize};

use crate::models::Vitals;

const HEART_RATE_LOW: u16 = 60;
const HEART_RATE_HIGH: u16 = 100;
const SYSTOLIC_HIGH: u16 = 140;
const SPO2_LOW: u16 = 95;
const TEMPERATURE_HIGH_C: f64 = 37.5;

/// Display flag for a single reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadingFlag {
    #[default]
    Normal,
    Warning,
}

impl ReadingFlag {
    fn from_warning(warning: bool) -> Self {
        if warning {
            ReadingFlag::Warning
        } else {
            ReadingFlag::Normal
        }
    }
}

/// Flags for every reading in a snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VitalsAssessment {
    pub heart_rate: ReadingFlag,
    pub blood_pressure: ReadingFlag,
    pub spo2: ReadingFlag,
    pub temperature: ReadingFlag,
    pub respiratory_rate: ReadingFlag,
}

impl VitalsAssessment {
    pub fn any_warning(&self) -> bool {
        [
            self.heart_rate,
            self.blood_pressure,
            self.spo2,
            self.temperature,
            self.respiratory_rate,
        ]
        .contains(&ReadingFlag::Warning)
    }
}

/// Flag the readings a dashboard would highlight.
///
/// Respiratory rate is always shown as normal.
pub fn assess(vitals: &Vitals) -> VitalsAssessment {
    VitalsAssessment {
        heart_rate: ReadingFlag::from_warning(
            vitals.heart_rate > HEART_RATE_HIGH || vitals.heart_rate < HEART_RATE_LOW,
        ),
        blood_pressure: ReadingFlag::from_warning(vitals.blood_pressure_systolic > SYSTOLIC_HIGH),
        spo2: ReadingFlag::from_warning(vitals.spo2 < SPO2_LOW),
        temperature: ReadingFlag::from_warning(vitals.temperature > TEMPERATURE_HIGH_C),
        respiratory_rate: ReadingFlag::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_defaults_are_normal() {
        let assessment = assess(&Vitals::admission_default());
        assert!(!assessment.any_warning());
    }

    #[test]
    fn test_flags_out_of_band_readings() {
        let vitals = Vitals {
            heart_rate: 45,
            blood_pressure_systolic: 145,
            blood_pressure_diastolic: 90,
            spo2: 94,
            temperature: 37.8,
            respiratory_rate: 20,
        };

        let assessment = assess(&vitals);
        assert_eq!(assessment.heart_rate, ReadingFlag::Warning);
        assert_eq!(assessment.blood_pressure, ReadingFlag::Warning);
        assert_eq!(assessment.spo2, ReadingFlag::Warning);
        assert_eq!(assessment.temperature, ReadingFlag::Warning);
        assert_eq!(assessment.respiratory_rate, ReadingFlag::Normal);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let vitals = Vitals {
            heart_rate: 100,
            blood_pressure_systolic: 140,
            spo2: 95,
            temperature: 37.5,
            ..Vitals::admission_default()
        };
        assert!(!assess(&vitals).any_warning());
    }
}
