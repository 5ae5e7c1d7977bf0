//! Vitals generation and assessment.

mod assessment;
mod generator;

pub use assessment::{assess, ReadingFlag, VitalsAssessment};
pub use generator::{next_vitals, stability_factor, VitalsGenerator};
