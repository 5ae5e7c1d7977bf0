//! Bounded random-walk generator for simulated vitals.
//!
//! Each field moves by a symmetric random step whose width is the
//! status-derived stability factor:
//! - Stable: 1
//! - Warning / Under Care: 3
//! - Critical: 8
//!
//! SpO2 and respiratory rate use a narrower step, `1 + factor / 3`
//! (1, 2 and 3 for the statuses above). Temperature drifts continuously
//! by up to `0.05 * factor` degrees either way.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::models::{
    clamp_temperature, PatientStatus, Vitals, DIASTOLIC_RANGE, HEART_RATE_RANGE,
    RESPIRATORY_RATE_RANGE, SPO2_RANGE, SYSTOLIC_RANGE,
};

const CRITICAL_FACTOR: u16 = 8;

/// Maximum temperature drift per tick per unit of stability factor (°C).
const TEMPERATURE_DRIFT_C: f64 = 0.1;

/// Severity-derived perturbation width. Discharged patients do not move.
pub fn stability_factor(status: PatientStatus) -> u16 {
    match status {
        PatientStatus::Stable | PatientStatus::PendingDischarge => 1,
        PatientStatus::Warning | PatientStatus::UnderCare => 3,
        PatientStatus::Critical => CRITICAL_FACTOR,
        PatientStatus::Discharged => 0,
    }
}

/// Compute the next vitals snapshot. The input is never modified and the
/// result always lies within the clamp ranges.
pub fn next_vitals<R: Rng + ?Sized>(current: &Vitals, status: PatientStatus, rng: &mut R) -> Vitals {
    let factor = stability_factor(status);
    if factor == 0 {
        return current.clamped();
    }

    let wide = i32::from(factor);
    let narrow = 1 + i32::from(factor / 3);
    let drift = (rng.gen::<f64>() - 0.5) * TEMPERATURE_DRIFT_C * f64::from(factor);

    Vitals {
        heart_rate: HEART_RATE_RANGE.clamp(step(current.heart_rate, wide, rng)),
        blood_pressure_systolic: SYSTOLIC_RANGE
            .clamp(step(current.blood_pressure_systolic, wide, rng)),
        blood_pressure_diastolic: DIASTOLIC_RANGE
            .clamp(step(current.blood_pressure_diastolic, wide, rng)),
        spo2: SPO2_RANGE.clamp(step(current.spo2, narrow, rng)),
        temperature: clamp_temperature(current.temperature + drift),
        respiratory_rate: RESPIRATORY_RATE_RANGE
            .clamp(step(current.respiratory_rate, narrow, rng)),
    }
}

fn step<R: Rng + ?Sized>(value: u16, width: i32, rng: &mut R) -> i32 {
    i32::from(value) + rng.gen_range(-width..=width)
}

/// Vitals generator owning its random source.
pub struct VitalsGenerator<R: Rng = ChaCha8Rng> {
    rng: R,
}

impl VitalsGenerator<ChaCha8Rng> {
    /// Deterministic generator for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl<R: Rng> VitalsGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Compute the next snapshot for a patient in `status`.
    pub fn next(&mut self, current: &Vitals, status: PatientStatus) -> Vitals {
        next_vitals(current, status, &mut self.rng)
    }

    /// Access the random source, e.g. to share it with other simulators.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> Vitals {
        Vitals {
            heart_rate: 72,
            blood_pressure_systolic: 120,
            blood_pressure_diastolic: 80,
            spo2: 98,
            temperature: 36.6,
            respiratory_rate: 16,
        }
    }

    #[test]
    fn test_stability_factors() {
        assert_eq!(stability_factor(PatientStatus::Stable), 1);
        assert_eq!(stability_factor(PatientStatus::Warning), 3);
        assert_eq!(stability_factor(PatientStatus::Critical), 8);
        assert_eq!(stability_factor(PatientStatus::Discharged), 0);
    }

    #[test]
    fn test_stable_heart_rate_moves_by_at_most_one() {
        let mut generator = VitalsGenerator::seeded(7);
        let current = baseline();

        for _ in 0..500 {
            let next = generator.next(&current, PatientStatus::Stable);
            assert!((71..=73).contains(&next.heart_rate), "got {}", next.heart_rate);
        }
    }

    #[test]
    fn test_critical_heart_rate_moves_within_eight() {
        let mut generator = VitalsGenerator::seeded(11);
        let current = baseline();
        let mut saw_wide_step = false;

        for _ in 0..500 {
            let next = generator.next(&current, PatientStatus::Critical);
            assert!((64..=80).contains(&next.heart_rate), "got {}", next.heart_rate);
            if next.heart_rate.abs_diff(72) > 1 {
                saw_wide_step = true;
            }
        }
        assert!(saw_wide_step);
    }

    #[test]
    fn test_stable_temperature_drifts() {
        let mut generator = VitalsGenerator::seeded(1);
        let current = baseline();

        for status in [PatientStatus::Stable, PatientStatus::PendingDischarge] {
            let mut distinct = Vec::new();
            for _ in 0..200 {
                let next = generator.next(&current, status);
                assert!((next.temperature - 36.6).abs() <= 0.05 + 1e-9);
                if !distinct.contains(&next.temperature) {
                    distinct.push(next.temperature);
                }
            }
            assert!(distinct.len() > 1, "{:?} temperature never moved", status);
        }
    }

    #[test]
    fn test_narrow_step_grows_with_severity() {
        let current = baseline();
        for (status, width) in [
            (PatientStatus::Stable, 1),
            (PatientStatus::Warning, 2),
            (PatientStatus::Critical, 3),
        ] {
            let mut generator = VitalsGenerator::seeded(13);
            let mut widest = 0;
            for _ in 0..1000 {
                let next = generator.next(&current, status);
                let step = next.respiratory_rate.abs_diff(current.respiratory_rate);
                assert!(step <= width, "{:?} step {}", status, step);
                widest = widest.max(step);
            }
            assert_eq!(widest, width, "{:?}", status);
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let mut generator = VitalsGenerator::seeded(3);
        let current = baseline();
        let copy = current;
        let _ = generator.next(&current, PatientStatus::Critical);
        assert_eq!(current, copy);
    }

    #[test]
    fn test_discharged_does_not_move() {
        let mut generator = VitalsGenerator::seeded(5);
        let current = baseline();
        for _ in 0..50 {
            assert_eq!(generator.next(&current, PatientStatus::Discharged), current);
        }
    }

    #[test]
    fn test_clamps_at_range_edges() {
        let mut generator = VitalsGenerator::seeded(9);
        let edge = Vitals {
            heart_rate: 220,
            blood_pressure_systolic: 60,
            blood_pressure_diastolic: 150,
            spo2: 100,
            temperature: 42.0,
            respiratory_rate: 8,
        };

        for _ in 0..200 {
            let next = generator.next(&edge, PatientStatus::Critical);
            assert!(next.is_within_ranges(), "{:?}", next);
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = VitalsGenerator::seeded(42);
        let mut b = VitalsGenerator::seeded(42);
        let current = baseline();
        for _ in 0..20 {
            assert_eq!(
                a.next(&current, PatientStatus::Warning),
                b.next(&current, PatientStatus::Warning)
            );
        }
    }
}
