// models/src/prescription.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

pub const MAX_REFILLS: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionStatus {
    Active,
    Discontinued,
    Completed,
}

impl PrescriptionStatus {
    /// DISCONTINUED and COMPLETED permit no further transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PrescriptionStatus::Active)
    }
}

impl FromStr for PrescriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(PrescriptionStatus::Active),
            "DISCONTINUED" => Ok(PrescriptionStatus::Discontinued),
            "COMPLETED" => Ok(PrescriptionStatus::Completed),
            _ => Err(ValidationError::invalid("status", s)),
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrescriptionStatus::Active => write!(f, "ACTIVE"),
            PrescriptionStatus::Discontinued => write!(f, "DISCONTINUED"),
            PrescriptionStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub visit_id: Option<Uuid>,
    pub provider_id: Uuid,
    pub medication_name: String,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    /// Administration route. Free string in practice (PO, IV, IM, topical,
    /// and whatever the pharmacy system sends).
    pub route: String,
    pub duration: String,
    pub quantity: u32,
    pub refills: u8,
    pub instructions: Option<String>,
    pub notes: Option<String>,
    pub status: PrescriptionStatus,
    pub discontinued_reason: Option<String>,
    pub discontinued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionInput {
    pub patient_id: Uuid,
    pub visit_id: Option<Uuid>,
    pub provider_id: Uuid,
    pub medication_name: String,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub route: String,
    pub duration: String,
    pub quantity: u32,
    pub refills: Option<u8>,
    pub instructions: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of the mutable clinical fields. Only applies while the
/// prescription is still ACTIVE.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionPatch {
    pub medication_name: Option<String>,
    pub generic_name: Option<String>,
    pub brand_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub route: Option<String>,
    pub duration: Option<String>,
    pub quantity: Option<u32>,
    pub refills: Option<u8>,
    pub instructions: Option<String>,
    pub notes: Option<String>,
}

/// Result of screening a medication against a patient's recorded allergies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergyWarning {
    pub medication: String,
    pub matched_allergy: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_mark_discontinued_and_completed_terminal() {
        assert!(!PrescriptionStatus::Active.is_terminal());
        assert!(PrescriptionStatus::Discontinued.is_terminal());
        assert!(PrescriptionStatus::Completed.is_terminal());
    }

    #[test]
    fn should_round_trip_status_through_strings() {
        for status in [
            PrescriptionStatus::Active,
            PrescriptionStatus::Discontinued,
            PrescriptionStatus::Completed,
        ] {
            assert_eq!(
                PrescriptionStatus::from_str(&status.to_string()).unwrap(),
                status
            );
        }
    }
}
