// storage/src/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use models::audit::AuditEntry;
use models::errors::EmrResult;
use models::invoice::Invoice;
use models::patient::Patient;
use models::prescription::Prescription;
use models::visit::Visit;

use crate::engine::EmrStorage;

/// Purely in-process engine. Used by the test suites and for ephemeral
/// (`engine: memory`) deployments; nothing survives process exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    patients: RwLock<HashMap<Uuid, Patient>>,
    visits: RwLock<HashMap<Uuid, Visit>>,
    prescriptions: RwLock<HashMap<Uuid, Prescription>>,
    invoices: RwLock<HashMap<Uuid, Invoice>>,
    audit: RwLock<Vec<AuditEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

#[async_trait]
impl EmrStorage for MemoryStorage {
    async fn put_patient(&self, patient: &Patient) -> EmrResult<()> {
        self.patients
            .write()
            .await
            .insert(patient.id, patient.clone());
        Ok(())
    }

    async fn get_patient(&self, id: Uuid) -> EmrResult<Option<Patient>> {
        Ok(self.patients.read().await.get(&id).cloned())
    }

    async fn all_patients(&self) -> EmrResult<Vec<Patient>> {
        Ok(self.patients.read().await.values().cloned().collect())
    }

    async fn put_visit(&self, visit: &Visit) -> EmrResult<()> {
        self.visits.write().await.insert(visit.id, visit.clone());
        Ok(())
    }

    async fn get_visit(&self, id: Uuid) -> EmrResult<Option<Visit>> {
        Ok(self.visits.read().await.get(&id).cloned())
    }

    async fn all_visits(&self) -> EmrResult<Vec<Visit>> {
        Ok(self.visits.read().await.values().cloned().collect())
    }

    async fn put_prescription(&self, prescription: &Prescription) -> EmrResult<()> {
        self.prescriptions
            .write()
            .await
            .insert(prescription.id, prescription.clone());
        Ok(())
    }

    async fn get_prescription(&self, id: Uuid) -> EmrResult<Option<Prescription>> {
        Ok(self.prescriptions.read().await.get(&id).cloned())
    }

    async fn all_prescriptions(&self) -> EmrResult<Vec<Prescription>> {
        Ok(self.prescriptions.read().await.values().cloned().collect())
    }

    async fn put_invoice(&self, invoice: &Invoice) -> EmrResult<()> {
        self.invoices
            .write()
            .await
            .insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, id: Uuid) -> EmrResult<Option<Invoice>> {
        Ok(self.invoices.read().await.get(&id).cloned())
    }

    async fn all_invoices(&self) -> EmrResult<Vec<Invoice>> {
        Ok(self.invoices.read().await.values().cloned().collect())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> EmrResult<()> {
        self.audit.write().await.push(entry.clone());
        Ok(())
    }

    async fn all_audit(&self) -> EmrResult<Vec<AuditEntry>> {
        Ok(self.audit.read().await.clone())
    }

    async fn max_audit_id(&self) -> EmrResult<u64> {
        Ok(self
            .audit
            .read()
            .await
            .iter()
            .map(|e| e.id)
            .max()
            .unwrap_or(0))
    }

    async fn flush(&self) -> EmrResult<()> {
        Ok(())
    }
}
