// models/src/patient.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            "OTHER" => Ok(Gender::Other),
            _ => Err(ValidationError::invalid("gender", s)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "MALE"),
            Gender::Female => write!(f, "FEMALE"),
            Gender::Other => write!(f, "OTHER"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatientStatus {
    Active,
    Inactive,
}

impl FromStr for PatientStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(PatientStatus::Active),
            "INACTIVE" => Ok(PatientStatus::Inactive),
            _ => Err(ValidationError::invalid("status", s)),
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PatientStatus::Active => write!(f, "ACTIVE"),
            PatientStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

/// Human-readable patient identifier, `P<year>-<5-digit sequence>`.
/// Immutable once assigned; the sequence restarts each calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientCode(String);

impl PatientCode {
    pub fn new(year: i32, sequence: u32) -> Self {
        PatientCode(format!("P{}-{:05}", year, sequence))
    }

    /// The prefix shared by every code issued in `year`, e.g. `P2026-`.
    pub fn year_prefix(year: i32) -> String {
        format!("P{}-", year)
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let rest = s
            .strip_prefix('P')
            .ok_or_else(|| ValidationError::invalid("patient_code", s))?;
        let (year, seq) = rest
            .split_once('-')
            .ok_or_else(|| ValidationError::invalid("patient_code", s))?;
        if year.len() != 4 || year.parse::<i32>().is_err() {
            return Err(ValidationError::invalid("patient_code", s));
        }
        if seq.len() != 5 || seq.parse::<u32>().is_err() {
            return Err(ValidationError::invalid("patient_code", s));
        }
        Ok(PatientCode(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Insurance {
    pub provider: String,
    pub policy_number: String,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub code: PatientCode,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    #[serde(default)]
    pub current_medications: Vec<String>,
    pub family_history: Option<String>,
    pub insurance: Option<Insurance>,
    pub notes: Option<String>,
    pub status: PatientStatus,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Registration payload. List fields default to empty when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientInput {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub blood_type: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub current_medications: Option<Vec<String>>,
    pub family_history: Option<String>,
    pub insurance: Option<Insurance>,
    pub notes: Option<String>,
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub blood_type: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub current_medications: Option<Vec<String>>,
    pub family_history: Option<String>,
    pub insurance: Option<Insurance>,
    pub notes: Option<String>,
}

/// One row of a patient search result, with the association counts the
/// listing screens display next to each record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSearchRow {
    pub patient: Patient,
    pub visit_count: u64,
    pub prescription_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub new_last_30_days: u64,
}
