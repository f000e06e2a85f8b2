// services/src/prescriptions/tracker.rs
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use models::audit::AuditAction;
use models::errors::{EmrError, EmrResult, ValidationError};
use models::pagination::{Page, PageRequest};
use models::prescription::{
    AllergyWarning, Prescription, PrescriptionInput, PrescriptionPatch, PrescriptionStatus,
    MAX_REFILLS,
};
use storage::EmrStorage;

use crate::allergy::allergy_warnings;
use crate::audit::AuditService;
use crate::validate::require;

const ENTITY: &str = "prescription";

#[derive(Debug, Clone, Default)]
pub struct PrescriptionSearch {
    pub patient_id: Option<Uuid>,
    pub status: Option<PrescriptionStatus>,
    /// Matched case-insensitively against medication, generic and brand
    /// names.
    pub query: Option<String>,
    pub page: PageRequest,
}

/// A freshly created order together with the result of screening it
/// against the patient's recorded allergies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionCreated {
    pub prescription: Prescription,
    pub warnings: Vec<AllergyWarning>,
}

/// Records medication orders. ACTIVE -> DISCONTINUED and ACTIVE ->
/// COMPLETED are the only transitions; both are terminal.
pub struct PrescriptionTracker {
    storage: Arc<dyn EmrStorage>,
    audit: Arc<AuditService>,
}

impl PrescriptionTracker {
    pub fn new(storage: Arc<dyn EmrStorage>, audit: Arc<AuditService>) -> Self {
        PrescriptionTracker { storage, audit }
    }

    pub async fn create(
        &self,
        actor: &str,
        input: PrescriptionInput,
    ) -> EmrResult<PrescriptionCreated> {
        require("medication_name", &input.medication_name)?;
        require("dosage", &input.dosage)?;
        require("frequency", &input.frequency)?;
        require("route", &input.route)?;
        require("duration", &input.duration)?;
        if input.quantity == 0 {
            return Err(ValidationError::out_of_range("quantity", "must be at least 1").into());
        }
        let refills = input.refills.unwrap_or(0);
        if refills > MAX_REFILLS {
            return Err(ValidationError::out_of_range(
                "refills",
                format!("expected 0..={}, got {}", MAX_REFILLS, refills),
            )
            .into());
        }

        let patient = self
            .storage
            .get_patient(input.patient_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| EmrError::NotFound(format!("patient {}", input.patient_id)))?;
        if let Some(visit_id) = input.visit_id {
            self.storage
                .get_visit(visit_id)
                .await?
                .ok_or_else(|| EmrError::NotFound(format!("visit {}", visit_id)))?;
        }

        let names: Vec<&str> = [
            Some(input.medication_name.as_str()),
            input.generic_name.as_deref(),
            input.brand_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        let warnings = allergy_warnings(&patient.allergies, &names);
        for warning in &warnings {
            warn!(
                "allergy screen for patient {}: {}",
                patient.code, warning.message
            );
        }

        let now = Utc::now();
        let prescription = Prescription {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            visit_id: input.visit_id,
            provider_id: input.provider_id,
            medication_name: input.medication_name.trim().to_string(),
            generic_name: input.generic_name,
            brand_name: input.brand_name,
            dosage: input.dosage.trim().to_string(),
            frequency: input.frequency.trim().to_string(),
            route: input.route.trim().to_string(),
            duration: input.duration.trim().to_string(),
            quantity: input.quantity,
            refills,
            instructions: input.instructions,
            notes: input.notes,
            status: PrescriptionStatus::Active,
            discontinued_reason: None,
            discontinued_at: None,
            created_at: now,
            updated_at: now,
        };

        self.storage.put_prescription(&prescription).await?;
        info!(
            "prescribed {} for patient {}",
            prescription.medication_name, patient.code
        );
        self.audit
            .record(
                actor,
                AuditAction::Create,
                ENTITY,
                prescription.id,
                json!({
                    "patient_id": prescription.patient_id,
                    "medication_name": prescription.medication_name,
                    "dosage": prescription.dosage,
                    "quantity": prescription.quantity,
                    "refills": prescription.refills,
                    "allergy_warnings": warnings.len(),
                }),
            )
            .await;
        Ok(PrescriptionCreated {
            prescription,
            warnings,
        })
    }

    pub async fn get(&self, id: Uuid) -> EmrResult<Prescription> {
        self.storage
            .get_prescription(id)
            .await?
            .ok_or_else(|| EmrError::NotFound(format!("prescription {}", id)))
    }

    /// Clinical fields stay mutable only while the order is ACTIVE.
    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        patch: PrescriptionPatch,
    ) -> EmrResult<Prescription> {
        let mut prescription = self.get(id).await?;
        if prescription.status.is_terminal() {
            return Err(EmrError::BusinessRule(format!(
                "prescription {} is {} and can no longer be modified",
                id, prescription.status
            )));
        }
        if let Some(refills) = patch.refills {
            if refills > MAX_REFILLS {
                return Err(ValidationError::out_of_range(
                    "refills",
                    format!("expected 0..={}, got {}", MAX_REFILLS, refills),
                )
                .into());
            }
        }

        let mut changes = serde_json::Map::new();
        macro_rules! apply {
            ($field:ident) => {
                if let Some(value) = patch.$field {
                    changes.insert(stringify!($field).to_string(), json!(value));
                    prescription.$field = value;
                }
            };
            (opt $field:ident) => {
                if let Some(value) = patch.$field {
                    changes.insert(stringify!($field).to_string(), json!(value));
                    prescription.$field = Some(value);
                }
            };
        }
        apply!(medication_name);
        apply!(opt generic_name);
        apply!(opt brand_name);
        apply!(dosage);
        apply!(frequency);
        apply!(route);
        apply!(duration);
        apply!(quantity);
        apply!(refills);
        apply!(opt instructions);
        apply!(opt notes);

        require("medication_name", &prescription.medication_name)?;
        require("dosage", &prescription.dosage)?;

        prescription.updated_at = Utc::now();
        self.storage.put_prescription(&prescription).await?;
        self.audit
            .record(
                actor,
                AuditAction::Update,
                ENTITY,
                prescription.id,
                serde_json::Value::Object(changes),
            )
            .await;
        Ok(prescription)
    }

    /// One-way transition; a second call fails.
    pub async fn discontinue(
        &self,
        actor: &str,
        id: Uuid,
        reason: &str,
        notes: Option<String>,
    ) -> EmrResult<Prescription> {
        require("reason", reason)?;
        let mut prescription = self.get(id).await?;
        if prescription.status.is_terminal() {
            return Err(EmrError::BusinessRule(format!(
                "prescription {} is already {}",
                id, prescription.status
            )));
        }

        prescription.status = PrescriptionStatus::Discontinued;
        prescription.discontinued_reason = Some(reason.trim().to_string());
        prescription.discontinued_at = Some(Utc::now());
        if let Some(notes) = notes {
            prescription.notes = Some(notes);
        }
        prescription.updated_at = Utc::now();
        self.storage.put_prescription(&prescription).await?;
        info!("discontinued prescription {}: {}", id, reason.trim());
        self.audit
            .record(
                actor,
                AuditAction::Discontinue,
                ENTITY,
                prescription.id,
                json!({
                    "status": prescription.status,
                    "reason": prescription.discontinued_reason,
                }),
            )
            .await;
        Ok(prescription)
    }

    /// The other terminal path: the course was finished as ordered.
    pub async fn complete(&self, actor: &str, id: Uuid) -> EmrResult<Prescription> {
        let mut prescription = self.get(id).await?;
        if prescription.status.is_terminal() {
            return Err(EmrError::BusinessRule(format!(
                "prescription {} is already {}",
                id, prescription.status
            )));
        }

        prescription.status = PrescriptionStatus::Completed;
        prescription.updated_at = Utc::now();
        self.storage.put_prescription(&prescription).await?;
        self.audit
            .record(
                actor,
                AuditAction::Complete,
                ENTITY,
                prescription.id,
                json!({ "status": prescription.status }),
            )
            .await;
        Ok(prescription)
    }

    pub async fn search(&self, criteria: PrescriptionSearch) -> EmrResult<Page<Prescription>> {
        let mut prescriptions = self.storage.all_prescriptions().await?;

        if let Some(patient_id) = criteria.patient_id {
            prescriptions.retain(|p| p.patient_id == patient_id);
        }
        if let Some(status) = criteria.status {
            prescriptions.retain(|p| p.status == status);
        }
        if let Some(ref query) = criteria.query {
            let token = query.trim().to_lowercase();
            if !token.is_empty() {
                prescriptions.retain(|p| {
                    p.medication_name.to_lowercase().contains(&token)
                        || p.generic_name
                            .as_deref()
                            .map(|n| n.to_lowercase().contains(&token))
                            .unwrap_or(false)
                        || p.brand_name
                            .as_deref()
                            .map(|n| n.to_lowercase().contains(&token))
                            .unwrap_or(false)
                });
            }
        }

        prescriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_vec(prescriptions, criteria.page))
    }
}
