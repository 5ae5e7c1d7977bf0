//! Built-in default dataset used when no stored snapshot is usable.

use super::care::{
    AlertSeverity, BillItem, Medication, MedicationStatus, Report, ReportKind, ReportStatus,
    TimeOfDay,
};
use super::patient::{Gender, Patient, PatientStatus};
use super::vitals::Vitals;

#[allow(clippy::too_many_arguments)]
fn seed_patient(
    id: &str,
    name: &str,
    age: u32,
    gender: Gender,
    ward: &str,
    bed: &str,
    doctor: (&str, &str),
    status: PatientStatus,
    vitals: Vitals,
) -> Patient {
    let mut patient = Patient::new(id.into(), name.into(), age, gender, ward.into());
    patient.bed = bed.into();
    patient.assigned_doctor = doctor.0.into();
    patient.doctor_phone = Some(doctor.1.into());
    patient.status = status;
    patient.vitals = vitals;
    patient
}

/// The four-patient ward used for first launch and corrupt-storage recovery.
pub fn initial_patients() -> Vec<Patient> {
    let mut wilson = seed_patient(
        "p1",
        "James Wilson",
        65,
        Gender::Male,
        "ICU-A",
        "01",
        ("Dr. Sarah Chen", "555-0101"),
        PatientStatus::Stable,
        Vitals {
            heart_rate: 72,
            blood_pressure_systolic: 120,
            blood_pressure_diastolic: 80,
            spo2: 98,
            temperature: 36.6,
            respiratory_rate: 16,
        },
    );
    wilson.billing = vec![
        BillItem::new("Initial Consultation", 150.0),
        BillItem::new("Blood Test Panel", 200.0),
    ];
    wilson.medications = vec![
        Medication {
            id: "m1".into(),
            name: "Lisinopril".into(),
            dosage: "10mg".into(),
            frequency: "Once daily".into(),
            time_of_day: TimeOfDay::Morning,
            status: MedicationStatus::Upcoming,
            instructions: Some("Take with food".into()),
        },
        Medication {
            id: "m2".into(),
            name: "Atorvastatin".into(),
            dosage: "20mg".into(),
            frequency: "Once daily".into(),
            time_of_day: TimeOfDay::Night,
            status: MedicationStatus::Taken,
            instructions: Some("Before bed".into()),
        },
    ];
    wilson.reports = vec![
        Report {
            id: "r1".into(),
            title: "Blood Chemistry Panel".into(),
            date: "2024-02-15".into(),
            kind: ReportKind::Lab,
            doctor: "Dr. Sarah Chen".into(),
            status: ReportStatus::Ready,
        },
        Report {
            id: "r2".into(),
            title: "Chest X-Ray".into(),
            date: "2024-02-14".into(),
            kind: ReportKind::Imaging,
            doctor: "Dr. Smith".into(),
            status: ReportStatus::Ready,
        },
    ];

    let mut garcia = seed_patient(
        "p2",
        "Maria Garcia",
        54,
        Gender::Female,
        "ICU-A",
        "02",
        ("Dr. Ahmed Khan", "555-0102"),
        PatientStatus::Warning,
        Vitals {
            heart_rate: 95,
            blood_pressure_systolic: 145,
            blood_pressure_diastolic: 90,
            spo2: 94,
            temperature: 37.8,
            respiratory_rate: 20,
        },
    );
    garcia.raise_alert("Elevated Heart Rate", AlertSeverity::Medium);

    let mut johnson = seed_patient(
        "p3",
        "Robert Johnson",
        78,
        Gender::Male,
        "ICU-B",
        "01",
        ("Dr. Emily Davis", "555-0103"),
        PatientStatus::Critical,
        Vitals {
            heart_rate: 45,
            blood_pressure_systolic: 85,
            blood_pressure_diastolic: 50,
            spo2: 88,
            temperature: 35.9,
            respiratory_rate: 10,
        },
    );
    johnson.raise_alert("Bradycardia Alert", AlertSeverity::High);
    johnson.raise_alert("Low SpO2", AlertSeverity::High);

    let taylor = seed_patient(
        "p4",
        "Linda Taylor",
        42,
        Gender::Female,
        "Gen-A",
        "05",
        ("Dr. Sarah Chen", "555-0101"),
        PatientStatus::Stable,
        Vitals {
            heart_rate: 68,
            blood_pressure_systolic: 118,
            blood_pressure_diastolic: 76,
            spo2: 99,
            temperature: 36.5,
            respiratory_rate: 14,
        },
    );

    vec![wilson, garcia, johnson, taylor]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_patients() {
        let patients = initial_patients();
        assert_eq!(patients.len(), 4);

        let ids: Vec<_> = patients.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);

        assert!(patients.iter().all(|p| p.vitals.is_within_ranges()));
        assert_eq!(patients[2].status, PatientStatus::Critical);
        assert_eq!(patients[2].unacknowledged_alerts().count(), 2);
        assert_eq!(patients[0].billing_total(), 350.0);
    }
}
