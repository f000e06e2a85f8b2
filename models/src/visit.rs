// models/src/visit.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

/// Well-known visit types. The field itself stays a free string so imports
/// from partner systems with their own vocabularies are not rejected.
pub const KNOWN_VISIT_TYPES: &[&str] = &[
    "CONSULTATION",
    "FOLLOW_UP",
    "EMERGENCY",
    "ROUTINE_CHECKUP",
    "TELEHEALTH",
    "PROCEDURE",
];

/// Intake vital signs. Each field is independently optional and checked
/// against clinical-plausibility bounds on intake; no cross-field checks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vitals {
    pub systolic_bp: Option<u16>,
    pub diastolic_bp: Option<u16>,
    pub heart_rate: Option<u16>,
    pub respiratory_rate: Option<u16>,
    pub temperature_c: Option<f32>,
    pub spo2: Option<u8>,
    pub weight_kg: Option<f32>,
    pub height_cm: Option<f32>,
    pub pain_scale: Option<u8>,
}

fn check_range<T: PartialOrd + std::fmt::Display + Copy>(
    field: &str,
    value: Option<T>,
    min: T,
    max: T,
) -> ValidationResult<()> {
    if let Some(v) = value {
        if v < min || v > max {
            return Err(ValidationError::out_of_range(
                field,
                format!("expected {}..={}, got {}", min, max, v),
            ));
        }
    }
    Ok(())
}

impl Vitals {
    pub fn validate(&self) -> ValidationResult<()> {
        check_range("systolic_bp", self.systolic_bp, 50, 300)?;
        check_range("diastolic_bp", self.diastolic_bp, 30, 200)?;
        check_range("heart_rate", self.heart_rate, 30, 200)?;
        check_range("respiratory_rate", self.respiratory_rate, 5, 60)?;
        check_range("temperature_c", self.temperature_c, 30.0, 45.0)?;
        check_range("spo2", self.spo2, 50, 100)?;
        check_range("weight_kg", self.weight_kg, 0.5, 500.0)?;
        check_range("height_cm", self.height_cm, 20.0, 280.0)?;
        check_range("pain_scale", self.pain_scale, 0, 10)?;
        Ok(())
    }
}

/// Subjective / Objective / Assessment / Plan, all free text and mutable
/// for as long as the visit stays unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SoapNote {
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Diagnosis {
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub icd10_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub visit_type: String,
    pub occurred_at: DateTime<Utc>,
    pub chief_complaint: Option<String>,
    pub vitals: Option<Vitals>,
    #[serde(default)]
    pub soap: SoapNote,
    #[serde(default)]
    pub diagnosis: Diagnosis,
    pub follow_up: Option<FollowUp>,
    pub notes: Option<String>,
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitInput {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub visit_type: String,
    /// Defaults to the current time when omitted.
    pub occurred_at: Option<DateTime<Utc>>,
    pub chief_complaint: Option<String>,
    pub vitals: Option<Vitals>,
    pub soap: Option<SoapNote>,
    pub diagnosis: Option<Diagnosis>,
    pub follow_up: Option<FollowUp>,
    pub notes: Option<String>,
}

/// Consultation-time amendments. Each section replaces its counterpart
/// wholesale when supplied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitUpdate {
    pub chief_complaint: Option<String>,
    pub vitals: Option<Vitals>,
    pub soap: Option<SoapNote>,
    pub diagnosis: Option<Diagnosis>,
    pub follow_up: Option<FollowUp>,
    pub notes: Option<String>,
}

impl VisitUpdate {
    pub fn is_empty(&self) -> bool {
        self.chief_complaint.is_none()
            && self.vitals.is_none()
            && self.soap.is_none()
            && self.diagnosis.is_none()
            && self.follow_up.is_none()
            && self.notes.is_none()
    }
}
