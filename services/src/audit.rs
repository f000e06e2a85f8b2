// services/src/audit.rs
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error};
use serde_json::Value;

use models::audit::{AuditAction, AuditEntry, AuditFilter};
use models::errors::EmrResult;
use storage::EmrStorage;

/// Field names whose values never reach the audit trail in the clear.
const SENSITIVE_FIELDS: &[&str] = &["phone", "email", "policy_number", "date_of_birth"];
const REDACTED: &str = "[REDACTED]";

/// Append-only sink for every mutating domain operation. Ids are sequential
/// and survive restarts (seeded from the highest persisted id).
pub struct AuditService {
    storage: Arc<dyn EmrStorage>,
    next_id: AtomicU64,
}

impl AuditService {
    pub async fn new(storage: Arc<dyn EmrStorage>) -> EmrResult<Arc<Self>> {
        let max_id = storage.max_audit_id().await?;
        Ok(Arc::new(AuditService {
            storage,
            next_id: AtomicU64::new(max_id + 1),
        }))
    }

    /// Records one entry. A failed audit write is logged and swallowed: the
    /// domain mutation it describes has already committed, and the sink must
    /// never turn a successful operation into a failed one.
    pub async fn record(
        &self,
        actor: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: impl Display,
        changes: Value,
    ) {
        let mut changes = changes;
        redact(&mut changes);
        let entry = AuditEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            actor: actor.to_string(),
            action,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            changes: changes.to_string(),
            recorded_at_nanos: AuditEntry::now_nanos(),
        };
        debug!(
            "audit: {} {} {}/{}",
            entry.actor, entry.action, entry.entity_type, entry.entity_id
        );
        if let Err(err) = self.storage.append_audit(&entry).await {
            error!("failed to persist audit entry {}: {}", entry.id, err);
        }
    }

    /// Reporting read path: filter, newest first, offset/limit.
    pub async fn search(&self, filter: AuditFilter) -> EmrResult<Vec<AuditEntry>> {
        let mut results = self.storage.all_audit().await?;
        results.retain(|entry| filter.matches(entry));
        results.sort_by(|a, b| {
            b.recorded_at_nanos
                .cmp(&a.recorded_at_nanos)
                .then(b.id.cmp(&a.id))
        });

        let limit = if filter.limit == 0 {
            AuditFilter::DEFAULT_LIMIT
        } else {
            filter.limit
        };
        let start = filter.offset.min(results.len());
        let end = (start + limit).min(results.len());
        Ok(results[start..end].to_vec())
    }
}

/// Masks sensitive values in place, recursing into nested objects so fields
/// like `emergency_contact.phone` are covered too.
fn redact(value: &mut Value) {
    if let Value::Object(map) = value {
        for (key, child) in map.iter_mut() {
            if SENSITIVE_FIELDS.contains(&key.as_str()) {
                if !child.is_null() {
                    *child = Value::String(REDACTED.to_string());
                }
            } else {
                redact(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage::MemoryStorage;

    #[tokio::test]
    async fn should_assign_sequential_ids_and_redact() {
        let storage: Arc<dyn EmrStorage> = Arc::new(MemoryStorage::new());
        let audit = AuditService::new(storage.clone()).await.unwrap();

        audit
            .record(
                "reception.1",
                AuditAction::Create,
                "patient",
                "p-1",
                json!({
                    "first_name": "Ama",
                    "phone": "+233201234567",
                    "emergency_contact": { "name": "Kojo", "phone": "+233209999999" }
                }),
            )
            .await;
        audit
            .record("reception.1", AuditAction::Update, "patient", "p-1", json!({}))
            .await;

        let entries = storage.all_audit().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[1].id, 2);

        let changes: Value = serde_json::from_str(&entries[0].changes).unwrap();
        assert_eq!(changes["first_name"], "Ama");
        assert_eq!(changes["phone"], REDACTED);
        assert_eq!(changes["emergency_contact"]["phone"], REDACTED);
        assert_eq!(changes["emergency_contact"]["name"], "Kojo");
    }

    #[tokio::test]
    async fn should_filter_and_page_newest_first() {
        let storage: Arc<dyn EmrStorage> = Arc::new(MemoryStorage::new());
        let audit = AuditService::new(storage.clone()).await.unwrap();

        for i in 0..5 {
            audit
                .record(
                    if i % 2 == 0 { "alice" } else { "bob" },
                    AuditAction::Update,
                    "invoice",
                    format!("inv-{}", i),
                    json!({}),
                )
                .await;
        }

        let all = audit.search(AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all[0].id > all[4].id);

        let alice_only = audit
            .search(AuditFilter {
                actor: Some("alice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(alice_only.len(), 3);

        let window = audit
            .search(AuditFilter {
                offset: 1,
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].id, 4);
    }

    #[tokio::test]
    async fn should_seed_next_id_from_persisted_trail() {
        let storage: Arc<dyn EmrStorage> = Arc::new(MemoryStorage::new());
        {
            let audit = AuditService::new(storage.clone()).await.unwrap();
            audit
                .record("x", AuditAction::Create, "patient", "p", json!({}))
                .await;
        }
        let audit = AuditService::new(storage.clone()).await.unwrap();
        audit
            .record("x", AuditAction::Update, "patient", "p", json!({}))
            .await;

        let ids: Vec<u64> = storage
            .all_audit()
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
