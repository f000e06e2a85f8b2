// storage/src/engine.rs
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use models::audit::AuditEntry;
use models::errors::EmrResult;
use models::invoice::Invoice;
use models::patient::Patient;
use models::prescription::Prescription;
use models::visit::Visit;

use crate::config::{StorageConfig, StorageEngineKind};
use crate::memory::MemoryStorage;
use crate::sled_store::SledStorage;

/// Persistence boundary for the EMR domain. Every record is exclusively
/// owned by the store; services keep no authoritative state between calls.
///
/// `put_*` upserts; existence and uniqueness checks belong to the services.
/// `all_*` returns full scans that services filter and page in memory.
#[async_trait]
pub trait EmrStorage: Send + Sync + Debug {
    // --- patients ---
    async fn put_patient(&self, patient: &Patient) -> EmrResult<()>;
    async fn get_patient(&self, id: Uuid) -> EmrResult<Option<Patient>>;
    async fn all_patients(&self) -> EmrResult<Vec<Patient>>;

    // --- visits ---
    async fn put_visit(&self, visit: &Visit) -> EmrResult<()>;
    async fn get_visit(&self, id: Uuid) -> EmrResult<Option<Visit>>;
    async fn all_visits(&self) -> EmrResult<Vec<Visit>>;

    // --- prescriptions ---
    async fn put_prescription(&self, prescription: &Prescription) -> EmrResult<()>;
    async fn get_prescription(&self, id: Uuid) -> EmrResult<Option<Prescription>>;
    async fn all_prescriptions(&self) -> EmrResult<Vec<Prescription>>;

    // --- invoices ---
    async fn put_invoice(&self, invoice: &Invoice) -> EmrResult<()>;
    async fn get_invoice(&self, id: Uuid) -> EmrResult<Option<Invoice>>;
    async fn all_invoices(&self) -> EmrResult<Vec<Invoice>>;

    // --- audit trail (append-only) ---
    async fn append_audit(&self, entry: &AuditEntry) -> EmrResult<()>;
    async fn all_audit(&self) -> EmrResult<Vec<AuditEntry>>;
    /// Highest audit id persisted so far; 0 when the trail is empty. Used to
    /// seed the sequential id counter across restarts.
    async fn max_audit_id(&self) -> EmrResult<u64>;

    async fn flush(&self) -> EmrResult<()>;
}

/// Builds the configured engine.
pub fn open_storage(config: &StorageConfig) -> EmrResult<Arc<dyn EmrStorage>> {
    match config.engine {
        StorageEngineKind::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageEngineKind::Sled => Ok(Arc::new(SledStorage::open(&config.data_dir)?)),
    }
}
