// services/src/patients/registry.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Duration, Utc};
use log::info;
use serde_json::json;
use uuid::Uuid;

use models::audit::AuditAction;
use models::errors::{EmrError, EmrResult, ValidationError};
use models::pagination::{Page, PageRequest};
use models::patient::{
    Patient, PatientCode, PatientInput, PatientPatch, PatientSearchRow, PatientStats,
    PatientStatus,
};
use storage::EmrStorage;

use crate::audit::AuditService;
use crate::validate::{check_email, max_len, require, MAX_NAME_LEN, MAX_PHONE_LEN};

const ENTITY: &str = "patient";

/// Free-text token plus optional status filter. The token is matched
/// case-insensitively against code, first name, last name and phone; the
/// email field joins the match only when the token contains '@'.
#[derive(Debug, Clone, Default)]
pub struct PatientSearch {
    pub query: Option<String>,
    pub status: Option<PatientStatus>,
    pub page: PageRequest,
}

/// Owns patient identity, demographics, generated codes and the
/// soft-delete lifecycle.
pub struct PatientRegistry {
    storage: Arc<dyn EmrStorage>,
    audit: Arc<AuditService>,
}

impl PatientRegistry {
    pub fn new(storage: Arc<dyn EmrStorage>, audit: Arc<AuditService>) -> Self {
        PatientRegistry { storage, audit }
    }

    pub async fn register(&self, actor: &str, input: PatientInput) -> EmrResult<Patient> {
        require("first_name", &input.first_name)?;
        require("last_name", &input.last_name)?;
        require("phone", &input.phone)?;
        max_len("first_name", &input.first_name, MAX_NAME_LEN)?;
        max_len("last_name", &input.last_name, MAX_NAME_LEN)?;
        max_len("phone", &input.phone, MAX_PHONE_LEN)?;
        let date_of_birth = input
            .date_of_birth
            .ok_or_else(|| ValidationError::missing("date_of_birth"))?;
        let gender = input
            .gender
            .ok_or_else(|| ValidationError::missing("gender"))?;
        if let Some(ref email) = input.email {
            check_email(email)?;
        }

        self.assert_unique(&input.phone, input.email.as_deref(), None)
            .await?;

        let code = self.next_code().await?;
        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            code: code.clone(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            date_of_birth,
            gender,
            phone: input.phone.trim().to_string(),
            email: input.email,
            address: input.address,
            emergency_contact: input.emergency_contact,
            blood_type: input.blood_type,
            allergies: input.allergies.unwrap_or_default(),
            chronic_conditions: input.chronic_conditions.unwrap_or_default(),
            current_medications: input.current_medications.unwrap_or_default(),
            family_history: input.family_history,
            insurance: input.insurance,
            notes: input.notes,
            status: PatientStatus::Active,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        self.storage.put_patient(&patient).await?;
        info!("registered patient {} ({})", patient.code, patient.id);
        self.audit
            .record(
                actor,
                AuditAction::Create,
                ENTITY,
                patient.id,
                json!({
                    "code": patient.code.as_str(),
                    "first_name": patient.first_name,
                    "last_name": patient.last_name,
                    "phone": patient.phone,
                    "email": patient.email,
                    "status": patient.status,
                }),
            )
            .await;
        Ok(patient)
    }

    pub async fn search(&self, criteria: PatientSearch) -> EmrResult<Page<PatientSearchRow>> {
        let mut patients: Vec<Patient> = self
            .storage
            .all_patients()
            .await?
            .into_iter()
            .filter(|p| !p.is_deleted())
            .collect();

        if let Some(status) = criteria.status {
            patients.retain(|p| p.status == status);
        }
        if let Some(ref query) = criteria.query {
            let token = query.trim().to_lowercase();
            if !token.is_empty() {
                let match_email = token.contains('@');
                patients.retain(|p| {
                    p.code.as_str().to_lowercase().contains(&token)
                        || p.first_name.to_lowercase().contains(&token)
                        || p.last_name.to_lowercase().contains(&token)
                        || p.phone.to_lowercase().contains(&token)
                        || (match_email
                            && p.email
                                .as_deref()
                                .map(|e| e.to_lowercase().contains(&token))
                                .unwrap_or(false))
                });
            }
        }

        // Newest first; codes increase with registration order, so they
        // break timestamp ties deterministically.
        patients.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.code.as_str().cmp(a.code.as_str()))
        });

        let mut visit_counts: HashMap<Uuid, u64> = HashMap::new();
        for visit in self.storage.all_visits().await? {
            *visit_counts.entry(visit.patient_id).or_default() += 1;
        }
        let mut prescription_counts: HashMap<Uuid, u64> = HashMap::new();
        for prescription in self.storage.all_prescriptions().await? {
            *prescription_counts.entry(prescription.patient_id).or_default() += 1;
        }

        Ok(Page::from_vec(patients, criteria.page).map(|patient| {
            let visit_count = visit_counts.get(&patient.id).copied().unwrap_or(0);
            let prescription_count = prescription_counts.get(&patient.id).copied().unwrap_or(0);
            PatientSearchRow {
                patient,
                visit_count,
                prescription_count,
            }
        }))
    }

    /// Soft-deleted records are invisible here; callers get NotFound.
    pub async fn get_by_id(&self, id: Uuid) -> EmrResult<Patient> {
        self.storage
            .get_patient(id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| EmrError::NotFound(format!("patient {}", id)))
    }

    pub async fn get_by_code(&self, code: &str) -> EmrResult<Patient> {
        PatientCode::parse(code)?;
        self.storage
            .all_patients()
            .await?
            .into_iter()
            .find(|p| p.code.as_str() == code && !p.is_deleted())
            .ok_or_else(|| EmrError::NotFound(format!("patient code {}", code)))
    }

    /// Partial update: only supplied fields change. Phone/email uniqueness
    /// is re-checked against every other non-deleted record.
    pub async fn update(&self, actor: &str, id: Uuid, patch: PatientPatch) -> EmrResult<Patient> {
        let mut patient = self.get_by_id(id).await?;

        if let Some(ref first_name) = patch.first_name {
            require("first_name", first_name)?;
            max_len("first_name", first_name, MAX_NAME_LEN)?;
        }
        if let Some(ref last_name) = patch.last_name {
            require("last_name", last_name)?;
            max_len("last_name", last_name, MAX_NAME_LEN)?;
        }
        if let Some(ref phone) = patch.phone {
            require("phone", phone)?;
            max_len("phone", phone, MAX_PHONE_LEN)?;
        }
        if let Some(ref email) = patch.email {
            check_email(email)?;
        }

        let effective_phone = patch.phone.as_deref().unwrap_or(&patient.phone);
        let effective_email = patch.email.as_deref().or(patient.email.as_deref());
        if patch.phone.is_some() || patch.email.is_some() {
            self.assert_unique(effective_phone, effective_email, Some(id))
                .await?;
        }

        let mut changes = serde_json::Map::new();
        macro_rules! apply {
            ($field:ident) => {
                if let Some(value) = patch.$field {
                    changes.insert(stringify!($field).to_string(), json!(value));
                    patient.$field = value;
                }
            };
            (opt $field:ident) => {
                if let Some(value) = patch.$field {
                    changes.insert(stringify!($field).to_string(), json!(value));
                    patient.$field = Some(value);
                }
            };
        }
        apply!(first_name);
        apply!(last_name);
        apply!(date_of_birth);
        apply!(gender);
        apply!(phone);
        apply!(opt email);
        apply!(opt address);
        apply!(opt emergency_contact);
        apply!(opt blood_type);
        apply!(allergies);
        apply!(chronic_conditions);
        apply!(current_medications);
        apply!(opt family_history);
        apply!(opt insurance);
        apply!(opt notes);

        patient.updated_at = Utc::now();
        self.storage.put_patient(&patient).await?;
        self.audit
            .record(
                actor,
                AuditAction::Update,
                ENTITY,
                patient.id,
                serde_json::Value::Object(changes),
            )
            .await;
        Ok(patient)
    }

    /// Direct overwrite; ACTIVE/INACTIVE carry no transition rules.
    pub async fn set_status(
        &self,
        actor: &str,
        id: Uuid,
        status: PatientStatus,
    ) -> EmrResult<Patient> {
        let mut patient = self.get_by_id(id).await?;
        patient.status = status;
        patient.updated_at = Utc::now();
        self.storage.put_patient(&patient).await?;
        self.audit
            .record(
                actor,
                AuditAction::StatusChange,
                ENTITY,
                patient.id,
                json!({ "status": status }),
            )
            .await;
        Ok(patient)
    }

    /// Deletion is blocked, never cascaded, while visits reference the
    /// patient.
    pub async fn soft_delete(&self, actor: &str, id: Uuid) -> EmrResult<Patient> {
        let mut patient = self.get_by_id(id).await?;

        let visit_count = self
            .storage
            .all_visits()
            .await?
            .iter()
            .filter(|v| v.patient_id == id)
            .count();
        if visit_count > 0 {
            return Err(EmrError::BusinessRule(format!(
                "cannot delete patient with {} existing visit(s)",
                visit_count
            )));
        }

        patient.deleted_at = Some(Utc::now());
        patient.status = PatientStatus::Inactive;
        patient.updated_at = Utc::now();
        self.storage.put_patient(&patient).await?;
        info!("soft-deleted patient {}", patient.code);
        self.audit
            .record(
                actor,
                AuditAction::SoftDelete,
                ENTITY,
                patient.id,
                json!({ "status": patient.status, "deleted_at": patient.deleted_at }),
            )
            .await;
        Ok(patient)
    }

    pub async fn restore(&self, actor: &str, id: Uuid) -> EmrResult<Patient> {
        let mut patient = self
            .storage
            .get_patient(id)
            .await?
            .ok_or_else(|| EmrError::NotFound(format!("patient {}", id)))?;
        if !patient.is_deleted() {
            return Err(EmrError::BusinessRule(format!(
                "patient {} is not deleted",
                patient.code
            )));
        }

        patient.deleted_at = None;
        patient.status = PatientStatus::Active;
        patient.updated_at = Utc::now();
        self.storage.put_patient(&patient).await?;
        info!("restored patient {}", patient.code);
        self.audit
            .record(
                actor,
                AuditAction::Restore,
                ENTITY,
                patient.id,
                json!({ "status": patient.status }),
            )
            .await;
        Ok(patient)
    }

    /// Counts over non-deleted records; the 30-day window is wall-clock,
    /// not calendar-aligned.
    pub async fn stats(&self) -> EmrResult<PatientStats> {
        let cutoff = Utc::now() - Duration::days(30);
        let mut stats = PatientStats {
            total: 0,
            active: 0,
            inactive: 0,
            new_last_30_days: 0,
        };
        for patient in self.storage.all_patients().await? {
            if patient.is_deleted() {
                continue;
            }
            stats.total += 1;
            match patient.status {
                PatientStatus::Active => stats.active += 1,
                PatientStatus::Inactive => stats.inactive += 1,
            }
            if patient.created_at >= cutoff {
                stats.new_last_30_days += 1;
            }
        }
        Ok(stats)
    }

    /// Next code in this year's bucket. Soft-deleted patients keep their
    /// codes, so the count runs over every record ever issued one.
    async fn next_code(&self) -> EmrResult<PatientCode> {
        let year = Utc::now().year();
        let prefix = PatientCode::year_prefix(year);
        let issued = self
            .storage
            .all_patients()
            .await?
            .iter()
            .filter(|p| p.code.as_str().starts_with(&prefix))
            .count() as u32;
        Ok(PatientCode::new(year, issued + 1))
    }

    async fn assert_unique(
        &self,
        phone: &str,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> EmrResult<()> {
        let phone = phone.trim();
        for other in self.storage.all_patients().await? {
            if other.is_deleted() || Some(other.id) == exclude {
                continue;
            }
            if other.phone == phone {
                return Err(EmrError::Conflict(format!(
                    "a patient with phone '{}' already exists",
                    phone
                )));
            }
            if let (Some(email), Some(other_email)) = (email, other.email.as_deref()) {
                if email.eq_ignore_ascii_case(other_email) {
                    return Err(EmrError::Conflict(format!(
                        "a patient with email '{}' already exists",
                        email
                    )));
                }
            }
        }
        Ok(())
    }
}
