// models/src/audit.rs
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Kind of mutating action being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    StatusChange,
    SoftDelete,
    Restore,
    Lock,
    Discontinue,
    Complete,
    Discount,
    Payment,
    Refund,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::StatusChange => "STATUS_CHANGE",
            AuditAction::SoftDelete => "SOFT_DELETE",
            AuditAction::Restore => "RESTORE",
            AuditAction::Lock => "LOCK",
            AuditAction::Discontinue => "DISCONTINUE",
            AuditAction::Complete => "COMPLETE",
            AuditAction::Discount => "DISCOUNT",
            AuditAction::Payment => "PAYMENT",
            AuditAction::Refund => "REFUND",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE" => Ok(AuditAction::Create),
            "UPDATE" => Ok(AuditAction::Update),
            "STATUS_CHANGE" => Ok(AuditAction::StatusChange),
            "SOFT_DELETE" => Ok(AuditAction::SoftDelete),
            "RESTORE" => Ok(AuditAction::Restore),
            "LOCK" => Ok(AuditAction::Lock),
            "DISCONTINUE" => Ok(AuditAction::Discontinue),
            "COMPLETE" => Ok(AuditAction::Complete),
            "DISCOUNT" => Ok(AuditAction::Discount),
            "PAYMENT" => Ok(AuditAction::Payment),
            "REFUND" => Ok(AuditAction::Refund),
            _ => Err(ValidationError::invalid("action", s)),
        }
    }
}

/// One append-only audit record. Timestamps are kept as Unix nanoseconds so
/// the record bincode-encodes directly for the sled-backed sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct AuditEntry {
    /// Sequential id, assigned by the sink. Also the storage key.
    pub id: u64,
    /// Who performed the action.
    pub actor: String,
    pub action: AuditAction,
    /// Entity kind, e.g. "patient", "invoice".
    pub entity_type: String,
    pub entity_id: String,
    /// JSON object of changed fields, sensitive values already redacted.
    pub changes: String,
    pub recorded_at_nanos: u64,
}

impl AuditEntry {
    pub fn now_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// Parameters used to filter and paginate audit reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub since_nanos: Option<u64>,
    pub until_nanos: Option<u64>,
    pub offset: usize,
    pub limit: usize,
}

impl AuditFilter {
    pub const DEFAULT_LIMIT: usize = 50;

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(ref actor) = self.actor {
            if entry.actor != *actor {
                return false;
            }
        }
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(ref entity_type) = self.entity_type {
            if entry.entity_type != *entity_type {
                return false;
            }
        }
        if let Some(ref entity_id) = self.entity_id {
            if entry.entity_id != *entity_id {
                return false;
            }
        }
        if let Some(since) = self.since_nanos {
            if entry.recorded_at_nanos < since {
                return false;
            }
        }
        if let Some(until) = self.until_nanos {
            if entry.recorded_at_nanos > until {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(actor: &str, action: AuditAction, nanos: u64) -> AuditEntry {
        AuditEntry {
            id: 0,
            actor: actor.to_string(),
            action,
            entity_type: "patient".to_string(),
            entity_id: "x".to_string(),
            changes: "{}".to_string(),
            recorded_at_nanos: nanos,
        }
    }

    #[test]
    fn should_match_on_actor_action_and_window() {
        let e = entry("dr.adams", AuditAction::Create, 1_000);
        let filter = AuditFilter {
            actor: Some("dr.adams".to_string()),
            action: Some(AuditAction::Create),
            since_nanos: Some(500),
            until_nanos: Some(2_000),
            ..Default::default()
        };
        assert!(filter.matches(&e));

        let filter = AuditFilter {
            actor: Some("someone.else".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&e));

        let filter = AuditFilter {
            until_nanos: Some(999),
            ..Default::default()
        };
        assert!(!filter.matches(&e));
    }

    #[test]
    fn should_round_trip_action_names() {
        for action in [
            AuditAction::Create,
            AuditAction::StatusChange,
            AuditAction::SoftDelete,
            AuditAction::Refund,
        ] {
            assert_eq!(AuditAction::from_str(&action.to_string()).unwrap(), action);
        }
    }
}
