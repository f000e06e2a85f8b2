// models/src/roles.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    Billing,
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "DOCTOR" => Ok(Role::Doctor),
            "NURSE" => Ok(Role::Nurse),
            "RECEPTIONIST" => Ok(Role::Receptionist),
            "BILLING" => Ok(Role::Billing),
            _ => Err(ValidationError::invalid("role", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Doctor => write!(f, "DOCTOR"),
            Role::Nurse => write!(f, "NURSE"),
            Role::Receptionist => write!(f, "RECEPTIONIST"),
            Role::Billing => write!(f, "BILLING"),
        }
    }
}

/// Per-request caller identity, passed explicitly into every service call.
/// There is deliberately no process-wide "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor_id: String,
    pub role: Role,
}

impl ActorContext {
    pub fn new(actor_id: impl Into<String>, role: Role) -> Self {
        ActorContext {
            actor_id: actor_id.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_roles_case_insensitively() {
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert_eq!(Role::from_str("Receptionist").unwrap(), Role::Receptionist);
        assert!(Role::from_str("janitor").is_err());
    }
}
