// storage/src/sled_store.rs
use std::path::Path;

use async_trait::async_trait;
use bincode::config;
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use uuid::Uuid;

use models::audit::AuditEntry;
use models::errors::{EmrError, EmrResult};
use models::invoice::Invoice;
use models::patient::Patient;
use models::prescription::Prescription;
use models::visit::Visit;

use crate::engine::EmrStorage;

const PATIENTS_TREE: &str = "patients";
const VISITS_TREE: &str = "visits";
const PRESCRIPTIONS_TREE: &str = "prescriptions";
const INVOICES_TREE: &str = "invoices";
const AUDIT_TREE: &str = "audit";

/// Embedded persistent engine. Domain records are stored as JSON values
/// keyed by UUID; audit records are bincode-encoded and keyed by their
/// big-endian sequential id so iteration order is chronological.
#[derive(Debug)]
pub struct SledStorage {
    db: Db,
    patients: Tree,
    visits: Tree,
    prescriptions: Tree,
    invoices: Tree,
    audit: Tree,
}

impl SledStorage {
    pub fn open(data_dir: &Path) -> EmrResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("records");
        let db = sled::open(&db_path)?;
        let store = SledStorage {
            patients: db.open_tree(PATIENTS_TREE)?,
            visits: db.open_tree(VISITS_TREE)?,
            prescriptions: db.open_tree(PRESCRIPTIONS_TREE)?,
            invoices: db.open_tree(INVOICES_TREE)?,
            audit: db.open_tree(AUDIT_TREE)?,
            db,
        };
        info!("Opened sled store at {}", db_path.display());
        Ok(store)
    }

    fn put_json<T: Serialize>(tree: &Tree, id: Uuid, value: &T) -> EmrResult<()> {
        let bytes = serde_json::to_vec(value)?;
        tree.insert(id.as_bytes(), bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(tree: &Tree, id: Uuid) -> EmrResult<Option<T>> {
        match tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(tree: &Tree) -> EmrResult<Vec<T>> {
        let mut out = Vec::new();
        for item in tree.iter() {
            let (_, bytes) = item?;
            out.push(serde_json::from_slice(&bytes)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl EmrStorage for SledStorage {
    async fn put_patient(&self, patient: &Patient) -> EmrResult<()> {
        Self::put_json(&self.patients, patient.id, patient)
    }

    async fn get_patient(&self, id: Uuid) -> EmrResult<Option<Patient>> {
        Self::get_json(&self.patients, id)
    }

    async fn all_patients(&self) -> EmrResult<Vec<Patient>> {
        Self::scan_json(&self.patients)
    }

    async fn put_visit(&self, visit: &Visit) -> EmrResult<()> {
        Self::put_json(&self.visits, visit.id, visit)
    }

    async fn get_visit(&self, id: Uuid) -> EmrResult<Option<Visit>> {
        Self::get_json(&self.visits, id)
    }

    async fn all_visits(&self) -> EmrResult<Vec<Visit>> {
        Self::scan_json(&self.visits)
    }

    async fn put_prescription(&self, prescription: &Prescription) -> EmrResult<()> {
        Self::put_json(&self.prescriptions, prescription.id, prescription)
    }

    async fn get_prescription(&self, id: Uuid) -> EmrResult<Option<Prescription>> {
        Self::get_json(&self.prescriptions, id)
    }

    async fn all_prescriptions(&self) -> EmrResult<Vec<Prescription>> {
        Self::scan_json(&self.prescriptions)
    }

    async fn put_invoice(&self, invoice: &Invoice) -> EmrResult<()> {
        Self::put_json(&self.invoices, invoice.id, invoice)
    }

    async fn get_invoice(&self, id: Uuid) -> EmrResult<Option<Invoice>> {
        Self::get_json(&self.invoices, id)
    }

    async fn all_invoices(&self) -> EmrResult<Vec<Invoice>> {
        Self::scan_json(&self.invoices)
    }

    async fn append_audit(&self, entry: &AuditEntry) -> EmrResult<()> {
        let key = entry.id.to_be_bytes();
        let encoded = bincode::encode_to_vec(entry, config::standard())?;
        self.audit.insert(key, encoded)?;
        Ok(())
    }

    async fn all_audit(&self) -> EmrResult<Vec<AuditEntry>> {
        let mut out = Vec::new();
        for item in self.audit.iter() {
            let (_, bytes) = item?;
            let (entry, _): (AuditEntry, usize) =
                bincode::decode_from_slice(&bytes, config::standard())?;
            out.push(entry);
        }
        Ok(out)
    }

    async fn max_audit_id(&self) -> EmrResult<u64> {
        match self.audit.last()? {
            Some((key, _)) => {
                let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    EmrError::Storage("audit key is not a big-endian u64".to_string())
                })?;
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }

    async fn flush(&self) -> EmrResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
