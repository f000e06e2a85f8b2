// services/src/visits/ledger.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use serde_json::json;
use uuid::Uuid;

use models::audit::AuditAction;
use models::errors::{EmrError, EmrResult};
use models::pagination::{Page, PageRequest};
use models::visit::{Visit, VisitInput, VisitUpdate};
use storage::EmrStorage;

use crate::audit::AuditService;
use crate::validate::require;

const ENTITY: &str = "visit";

#[derive(Debug, Clone, Default)]
pub struct VisitSearch {
    pub patient_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub visit_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

/// Records clinical encounters against a patient and provider. A locked
/// visit is immutable; UNLOCKED -> LOCKED is the only transition and it is
/// terminal.
pub struct VisitLedger {
    storage: Arc<dyn EmrStorage>,
    audit: Arc<AuditService>,
}

impl VisitLedger {
    pub fn new(storage: Arc<dyn EmrStorage>, audit: Arc<AuditService>) -> Self {
        VisitLedger { storage, audit }
    }

    pub async fn create(&self, actor: &str, input: VisitInput) -> EmrResult<Visit> {
        require("visit_type", &input.visit_type)?;
        if let Some(ref vitals) = input.vitals {
            vitals.validate()?;
        }

        // Referential validity: the patient must exist and be visible.
        let patient = self
            .storage
            .get_patient(input.patient_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| EmrError::NotFound(format!("patient {}", input.patient_id)))?;

        let now = Utc::now();
        let visit = Visit {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            provider_id: input.provider_id,
            visit_type: input.visit_type.trim().to_string(),
            occurred_at: input.occurred_at.unwrap_or(now),
            chief_complaint: input.chief_complaint,
            vitals: input.vitals,
            soap: input.soap.unwrap_or_default(),
            diagnosis: input.diagnosis.unwrap_or_default(),
            follow_up: input.follow_up,
            notes: input.notes,
            locked: false,
            locked_at: None,
            locked_by: None,
            created_at: now,
            updated_at: now,
        };

        self.storage.put_visit(&visit).await?;
        info!("recorded {} visit for patient {}", visit.visit_type, patient.code);
        self.audit
            .record(
                actor,
                AuditAction::Create,
                ENTITY,
                visit.id,
                json!({
                    "patient_id": visit.patient_id,
                    "provider_id": visit.provider_id,
                    "visit_type": visit.visit_type,
                    "occurred_at": visit.occurred_at,
                }),
            )
            .await;
        Ok(visit)
    }

    pub async fn get(&self, id: Uuid) -> EmrResult<Visit> {
        self.storage
            .get_visit(id)
            .await?
            .ok_or_else(|| EmrError::NotFound(format!("visit {}", id)))
    }

    /// Consultation-time amendments: SOAP, vitals, diagnosis, follow-up,
    /// notes. Rejected once the visit is locked.
    pub async fn update(&self, actor: &str, id: Uuid, update: VisitUpdate) -> EmrResult<Visit> {
        let mut visit = self.get(id).await?;
        if visit.locked {
            return Err(EmrError::BusinessRule(format!(
                "visit {} is locked and can no longer be modified",
                id
            )));
        }
        if let Some(ref vitals) = update.vitals {
            vitals.validate()?;
        }

        let mut changed: Vec<&str> = Vec::new();
        if let Some(chief_complaint) = update.chief_complaint {
            visit.chief_complaint = Some(chief_complaint);
            changed.push("chief_complaint");
        }
        if let Some(vitals) = update.vitals {
            visit.vitals = Some(vitals);
            changed.push("vitals");
        }
        if let Some(soap) = update.soap {
            visit.soap = soap;
            changed.push("soap");
        }
        if let Some(diagnosis) = update.diagnosis {
            visit.diagnosis = diagnosis;
            changed.push("diagnosis");
        }
        if let Some(follow_up) = update.follow_up {
            visit.follow_up = Some(follow_up);
            changed.push("follow_up");
        }
        if let Some(notes) = update.notes {
            visit.notes = Some(notes);
            changed.push("notes");
        }

        visit.updated_at = Utc::now();
        self.storage.put_visit(&visit).await?;
        self.audit
            .record(
                actor,
                AuditAction::Update,
                ENTITY,
                visit.id,
                json!({ "sections": changed }),
            )
            .await;
        Ok(visit)
    }

    /// Terminal: once locked the record is immutable and cannot be
    /// re-locked.
    pub async fn lock(&self, actor: &str, id: Uuid) -> EmrResult<Visit> {
        let mut visit = self.get(id).await?;
        if visit.locked {
            return Err(EmrError::BusinessRule(format!(
                "visit {} is already locked",
                id
            )));
        }

        visit.locked = true;
        visit.locked_at = Some(Utc::now());
        visit.locked_by = Some(actor.to_string());
        visit.updated_at = Utc::now();
        self.storage.put_visit(&visit).await?;
        info!("locked visit {} by {}", id, actor);
        self.audit
            .record(
                actor,
                AuditAction::Lock,
                ENTITY,
                visit.id,
                json!({ "locked_at": visit.locked_at, "locked_by": visit.locked_by }),
            )
            .await;
        Ok(visit)
    }

    pub async fn search(&self, criteria: VisitSearch) -> EmrResult<Page<Visit>> {
        let mut visits = self.storage.all_visits().await?;

        if let Some(patient_id) = criteria.patient_id {
            visits.retain(|v| v.patient_id == patient_id);
        }
        if let Some(provider_id) = criteria.provider_id {
            visits.retain(|v| v.provider_id == provider_id);
        }
        if let Some(ref visit_type) = criteria.visit_type {
            visits.retain(|v| v.visit_type.eq_ignore_ascii_case(visit_type));
        }
        if let Some(from) = criteria.from {
            visits.retain(|v| v.occurred_at >= from);
        }
        if let Some(to) = criteria.to {
            visits.retain(|v| v.occurred_at <= to);
        }

        visits.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(Page::from_vec(visits, criteria.page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use models::patient::{Gender, PatientInput};
    use models::visit::{Diagnosis, SoapNote, Vitals};
    use storage::MemoryStorage;

    use crate::patients::PatientRegistry;

    async fn fixture() -> (VisitLedger, PatientRegistry, Arc<dyn EmrStorage>) {
        let storage: Arc<dyn EmrStorage> = Arc::new(MemoryStorage::new());
        let audit = AuditService::new(storage.clone()).await.unwrap();
        (
            VisitLedger::new(storage.clone(), audit.clone()),
            PatientRegistry::new(storage.clone(), audit),
            storage,
        )
    }

    async fn registered_patient(registry: &PatientRegistry) -> Uuid {
        registry
            .register(
                "reception",
                PatientInput {
                    first_name: "Ama".to_string(),
                    last_name: "Mensah".to_string(),
                    date_of_birth: NaiveDate::from_ymd_opt(1985, 6, 15),
                    gender: Some(Gender::Female),
                    phone: "+233200000001".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    fn visit_input(patient_id: Uuid) -> VisitInput {
        VisitInput {
            patient_id,
            provider_id: Uuid::new_v4(),
            visit_type: "CONSULTATION".to_string(),
            chief_complaint: Some("headache".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn should_create_visit_with_defaulted_timestamp() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;

        let before = Utc::now();
        let visit = ledger
            .create("dr.osei", visit_input(patient_id))
            .await
            .unwrap();
        assert!(visit.occurred_at >= before);
        assert!(!visit.locked);
        assert_eq!(visit.chief_complaint.as_deref(), Some("headache"));
    }

    #[tokio::test]
    async fn should_reject_visits_for_unknown_or_deleted_patients() {
        let (ledger, registry, _) = fixture().await;

        let err = ledger
            .create("dr.osei", visit_input(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));

        let patient_id = registered_patient(&registry).await;
        registry.soft_delete("admin", patient_id).await.unwrap();
        let err = ledger
            .create("dr.osei", visit_input(patient_id))
            .await
            .unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_reject_implausible_intake_vitals() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;

        let mut input = visit_input(patient_id);
        input.vitals = Some(Vitals {
            heart_rate: Some(250),
            ..Default::default()
        });
        assert!(matches!(
            ledger.create("dr.osei", input).await.unwrap_err(),
            EmrError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn should_accept_free_form_visit_types() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;

        let mut input = visit_input(patient_id);
        input.visit_type = "HOME_OUTREACH".to_string();
        let visit = ledger.create("dr.osei", input).await.unwrap();
        assert_eq!(visit.visit_type, "HOME_OUTREACH");
    }

    #[tokio::test]
    async fn should_amend_soap_and_diagnosis_until_locked() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let visit = ledger
            .create("dr.osei", visit_input(patient_id))
            .await
            .unwrap();

        let update = VisitUpdate {
            soap: Some(SoapNote {
                subjective: Some("patient reports persistent headache".to_string()),
                assessment: Some("tension headache".to_string()),
                ..Default::default()
            }),
            diagnosis: Some(Diagnosis {
                primary: Some("Tension-type headache".to_string()),
                secondary: vec![],
                icd10_codes: vec!["G44.209".to_string()],
            }),
            ..Default::default()
        };
        let updated = ledger.update("dr.osei", visit.id, update).await.unwrap();
        assert_eq!(
            updated.diagnosis.primary.as_deref(),
            Some("Tension-type headache")
        );
        assert_eq!(
            updated.soap.assessment.as_deref(),
            Some("tension headache")
        );
        // Untouched sections survive.
        assert_eq!(updated.chief_complaint.as_deref(), Some("headache"));
    }

    #[tokio::test]
    async fn should_freeze_visit_after_lock() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let visit = ledger
            .create("dr.osei", visit_input(patient_id))
            .await
            .unwrap();

        let locked = ledger.lock("dr.osei", visit.id).await.unwrap();
        assert!(locked.locked);
        assert_eq!(locked.locked_by.as_deref(), Some("dr.osei"));
        assert!(locked.locked_at.is_some());

        let update = VisitUpdate {
            notes: Some("late addendum".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ledger.update("dr.osei", visit.id, update).await.unwrap_err(),
            EmrError::BusinessRule(_)
        ));
        assert!(matches!(
            ledger.lock("dr.osei", visit.id).await.unwrap_err(),
            EmrError::BusinessRule(_)
        ));
    }

    #[tokio::test]
    async fn should_filter_and_page_visit_search() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        for _ in 0..3 {
            ledger
                .create("dr.osei", visit_input(patient_id))
                .await
                .unwrap();
        }
        let mut emergency = visit_input(patient_id);
        emergency.visit_type = "EMERGENCY".to_string();
        ledger.create("dr.osei", emergency).await.unwrap();

        let all = ledger
            .search(VisitSearch {
                patient_id: Some(patient_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.meta.total, 4);

        let emergencies = ledger
            .search(VisitSearch {
                visit_type: Some("emergency".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(emergencies.meta.total, 1);

        let none = ledger
            .search(VisitSearch {
                patient_id: Some(Uuid::new_v4()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(none.meta.total, 0);
    }
}
