//! Property tests for the vitals generator and history window.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pulseguard_core::models::{
    PatientStatus, Vitals, VitalsHistory, VitalsSample, DIASTOLIC_RANGE, HEART_RATE_RANGE,
    RESPIRATORY_RATE_RANGE, SPO2_RANGE, SYSTOLIC_RANGE, TEMPERATURE_MAX_C, TEMPERATURE_MIN_C,
};
use pulseguard_core::vitals::{next_vitals, VitalsGenerator};

fn any_status() -> impl Strategy<Value = PatientStatus> {
    prop_oneof![
        Just(PatientStatus::Stable),
        Just(PatientStatus::Warning),
        Just(PatientStatus::Critical),
        Just(PatientStatus::UnderCare),
        Just(PatientStatus::PendingDischarge),
        Just(PatientStatus::Discharged),
    ]
}

fn valid_vitals() -> impl Strategy<Value = Vitals> {
    (
        HEART_RATE_RANGE.min..=HEART_RATE_RANGE.max,
        SYSTOLIC_RANGE.min..=SYSTOLIC_RANGE.max,
        DIASTOLIC_RANGE.min..=DIASTOLIC_RANGE.max,
        SPO2_RANGE.min..=SPO2_RANGE.max,
        TEMPERATURE_MIN_C..=TEMPERATURE_MAX_C,
        RESPIRATORY_RATE_RANGE.min..=RESPIRATORY_RATE_RANGE.max,
    )
        .prop_map(|(hr, sys, dia, spo2, temp, rr)| Vitals {
            heart_rate: hr,
            blood_pressure_systolic: sys,
            blood_pressure_diastolic: dia,
            spo2,
            temperature: temp,
            respiratory_rate: rr,
        })
}

fn sample(n: usize) -> VitalsSample {
    VitalsSample {
        recorded_at: format!("t{}", n),
        vitals: Vitals::admission_default(),
    }
}

proptest! {
    #[test]
    fn test_next_vitals_stays_in_range(
        vitals in valid_vitals(),
        status in any_status(),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let next = next_vitals(&vitals, status, &mut rng);
        prop_assert!(next.is_within_ranges(), "{:?} -> {:?}", vitals, next);
    }

    #[test]
    fn test_repeated_ticks_stay_in_range(
        vitals in valid_vitals(),
        status in any_status(),
        seed in any::<u64>(),
    ) {
        let mut generator = VitalsGenerator::seeded(seed);
        let mut current = vitals;
        for _ in 0..50 {
            current = generator.next(&current, status);
            prop_assert!(current.is_within_ranges());
        }
    }

    #[test]
    fn test_history_never_exceeds_capacity(capacity in 1usize..40, pushes in 0usize..100) {
        let mut history = VitalsHistory::new(capacity);
        for n in 0..pushes {
            history.push(sample(n));
            prop_assert!(history.len() <= capacity);
        }
        prop_assert_eq!(history.len(), pushes.min(capacity));

        if pushes > capacity {
            prop_assert!(history.iter().all(|s| s.recorded_at != "t0"));
            let expected_oldest = format!("t{}", pushes - capacity);
            prop_assert_eq!(history.oldest().map(|s| s.recorded_at.as_str()), Some(expected_oldest.as_str()));
        }
    }
}

const FIELDS: [&str; 6] = ["heart rate", "systolic", "diastolic", "spo2", "temperature", "respiratory rate"];

/// Mean absolute per-tick change of every field, from a mid-range base.
fn mean_changes(status: PatientStatus, samples: usize) -> [f64; 6] {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let base = Vitals {
        heart_rate: 80,
        blood_pressure_systolic: 120,
        blood_pressure_diastolic: 80,
        spo2: 90,
        temperature: 37.0,
        respiratory_rate: 20,
    };

    let mut totals = [0.0; 6];
    for _ in 0..samples {
        let next = next_vitals(&base, status, &mut rng);
        totals[0] += f64::from(next.heart_rate.abs_diff(base.heart_rate));
        totals[1] += f64::from(next.blood_pressure_systolic.abs_diff(base.blood_pressure_systolic));
        totals[2] += f64::from(next.blood_pressure_diastolic.abs_diff(base.blood_pressure_diastolic));
        totals[3] += f64::from(next.spo2.abs_diff(base.spo2));
        totals[4] += (next.temperature - base.temperature).abs();
        totals[5] += f64::from(next.respiratory_rate.abs_diff(base.respiratory_rate));
    }
    totals.map(|total| total / samples as f64)
}

#[test]
fn test_severity_widens_spread() {
    let stable = mean_changes(PatientStatus::Stable, 2000);
    let warning = mean_changes(PatientStatus::Warning, 2000);
    let critical = mean_changes(PatientStatus::Critical, 2000);

    for (i, field) in FIELDS.iter().enumerate() {
        assert!(stable[i] > 0.0, "{} never moved when stable", field);
        assert!(stable[i] < warning[i], "{}: stable {} warning {}", field, stable[i], warning[i]);
        assert!(warning[i] < critical[i], "{}: warning {} critical {}", field, warning[i], critical[i]);
    }
    assert!(critical[0] > 3.0);
}

#[test]
fn test_stable_seventy_two_moves_by_one() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let base = Vitals {
        heart_rate: 72,
        ..Vitals::admission_default()
    };

    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..500 {
        let next = next_vitals(&base, PatientStatus::Stable, &mut rng);
        seen.insert(next.heart_rate);
    }
    assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![71, 72, 73]);
}

#[test]
fn test_critical_seventy_two_moves_within_eight() {
    let mut rng = ChaCha8Rng::seed_from_u64(100);
    let base = Vitals {
        heart_rate: 72,
        ..Vitals::admission_default()
    };

    let mut min = u16::MAX;
    let mut max = u16::MIN;
    for _ in 0..500 {
        let next = next_vitals(&base, PatientStatus::Critical, &mut rng);
        min = min.min(next.heart_rate);
        max = max.max(next.heart_rate);
    }
    assert!(min >= 64 && max <= 80);
    assert!(max - min > 2);
}
