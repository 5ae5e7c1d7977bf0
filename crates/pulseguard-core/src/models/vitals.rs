//! Vital sign snapshots, clamp ranges and the sliding history window.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of samples kept in a patient's history window.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Inclusive clamp range for an integer reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingRange {
    pub min: u16,
    pub max: u16,
}

impl ReadingRange {
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    /// Clamp a signed intermediate value into the range.
    pub fn clamp(&self, value: i32) -> u16 {
        value.clamp(i32::from(self.min), i32::from(self.max)) as u16
    }

    pub fn contains(&self, value: u16) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Heart rate, beats per minute.
pub const HEART_RATE_RANGE: ReadingRange = ReadingRange::new(30, 220);
/// Systolic blood pressure, mmHg.
pub const SYSTOLIC_RANGE: ReadingRange = ReadingRange::new(60, 250);
/// Diastolic blood pressure, mmHg.
pub const DIASTOLIC_RANGE: ReadingRange = ReadingRange::new(40, 150);
/// Peripheral oxygen saturation, percent.
pub const SPO2_RANGE: ReadingRange = ReadingRange::new(70, 100);
/// Respiratory rate, breaths per minute.
pub const RESPIRATORY_RATE_RANGE: ReadingRange = ReadingRange::new(8, 40);
/// Lower temperature bound, degrees Celsius.
pub const TEMPERATURE_MIN_C: f64 = 34.0;
/// Upper temperature bound, degrees Celsius.
pub const TEMPERATURE_MAX_C: f64 = 42.0;

/// One snapshot of a patient's physiological readings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    /// Beats per minute
    pub heart_rate: u16,
    /// Systolic pressure (mmHg)
    pub blood_pressure_systolic: u16,
    /// Diastolic pressure (mmHg)
    pub blood_pressure_diastolic: u16,
    /// Oxygen saturation (%)
    pub spo2: u16,
    /// Body temperature (°C), one decimal place
    pub temperature: f64,
    /// Breaths per minute
    pub respiratory_rate: u16,
}

impl Vitals {
    /// Readings assigned to a freshly admitted patient.
    pub fn admission_default() -> Self {
        Self {
            heart_rate: 80,
            blood_pressure_systolic: 120,
            blood_pressure_diastolic: 80,
            spo2: 98,
            temperature: 37.0,
            respiratory_rate: 16,
        }
    }

    /// Return a copy with every field forced into its clamp range.
    pub fn clamped(&self) -> Self {
        Self {
            heart_rate: HEART_RATE_RANGE.clamp(i32::from(self.heart_rate)),
            blood_pressure_systolic: SYSTOLIC_RANGE.clamp(i32::from(self.blood_pressure_systolic)),
            blood_pressure_diastolic: DIASTOLIC_RANGE
                .clamp(i32::from(self.blood_pressure_diastolic)),
            spo2: SPO2_RANGE.clamp(i32::from(self.spo2)),
            temperature: clamp_temperature(self.temperature),
            respiratory_rate: RESPIRATORY_RATE_RANGE.clamp(i32::from(self.respiratory_rate)),
        }
    }

    /// Check every field against its clamp range.
    pub fn is_within_ranges(&self) -> bool {
        HEART_RATE_RANGE.contains(self.heart_rate)
            && SYSTOLIC_RANGE.contains(self.blood_pressure_systolic)
            && DIASTOLIC_RANGE.contains(self.blood_pressure_diastolic)
            && SPO2_RANGE.contains(self.spo2)
            && RESPIRATORY_RATE_RANGE.contains(self.respiratory_rate)
            && (TEMPERATURE_MIN_C..=TEMPERATURE_MAX_C).contains(&self.temperature)
    }

    /// Blood pressure in the "systolic/diastolic" display form.
    pub fn blood_pressure_label(&self) -> String {
        format!(
            "{}/{}",
            self.blood_pressure_systolic, self.blood_pressure_diastolic
        )
    }

    /// Temperature to one decimal place, e.g. "36.6".
    pub fn temperature_label(&self) -> String {
        format!("{:.1}", self.temperature)
    }
}

impl Default for Vitals {
    fn default() -> Self {
        Self::admission_default()
    }
}

/// Clamp a temperature into range. Precision is kept; rounding is for display.
pub(crate) fn clamp_temperature(value: f64) -> f64 {
    if value.is_nan() {
        return Vitals::admission_default().temperature;
    }
    value.clamp(TEMPERATURE_MIN_C, TEMPERATURE_MAX_C)
}

/// A timestamped vitals snapshot stored in the history window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VitalsSample {
    /// When the snapshot was recorded (RFC 3339)
    pub recorded_at: String,
    /// The snapshot
    pub vitals: Vitals,
}

/// Fixed-capacity sliding window of past vitals, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalsHistory {
    capacity: usize,
    samples: VecDeque<VitalsSample>,
}

impl VitalsHistory {
    /// Create an empty window. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest entries while the window is full.
    pub fn push(&mut self, sample: VitalsSample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Change the capacity, trimming the oldest samples if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&VitalsSample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&VitalsSample> {
        self.samples.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VitalsSample> {
        self.samples.iter()
    }

    /// Heart rate series for chart rendering, oldest first.
    pub fn heart_rate_series(&self) -> Vec<u16> {
        self.samples.iter().map(|s| s.vitals.heart_rate).collect()
    }

    /// SpO2 series for chart rendering, oldest first.
    pub fn spo2_series(&self) -> Vec<u16> {
        self.samples.iter().map(|s| s.vitals.spo2).collect()
    }
}

impl Default for VitalsHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
