// services/src/access.rs
use std::collections::HashMap;
use std::str::FromStr;

use once_cell::sync::Lazy;

use models::errors::{EmrError, EmrResult};
use models::roles::{ActorContext, Role};

/// Every guarded operation across the domain services. The CLI (and any
/// future transport) runs the gate before dispatching to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PatientCreate,
    PatientRead,
    PatientUpdate,
    PatientSetStatus,
    PatientDelete,
    PatientRestore,
    PatientStats,
    VisitCreate,
    VisitRead,
    VisitUpdate,
    VisitLock,
    PrescriptionCreate,
    PrescriptionRead,
    PrescriptionUpdate,
    PrescriptionDiscontinue,
    PrescriptionComplete,
    InvoiceCreate,
    InvoiceUpdate,
    InvoiceRead,
    InvoiceDiscount,
    InvoicePayment,
    InvoiceRefund,
    AuditRead,
}

const ALL_STAFF: &[Role] = &[
    Role::Admin,
    Role::Doctor,
    Role::Nurse,
    Role::Receptionist,
    Role::Billing,
];
const FRONT_DESK: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse, Role::Receptionist];
const CLINICAL: &[Role] = &[Role::Admin, Role::Doctor, Role::Nurse];
const PRESCRIBERS: &[Role] = &[Role::Admin, Role::Doctor];
const BILLING_DESK: &[Role] = &[Role::Admin, Role::Billing, Role::Receptionist];
const BILLING_ONLY: &[Role] = &[Role::Admin, Role::Billing];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

static PERMISSIONS: Lazy<HashMap<Action, &'static [Role]>> = Lazy::new(|| {
    HashMap::from([
        (Action::PatientCreate, FRONT_DESK),
        (Action::PatientRead, ALL_STAFF),
        (Action::PatientUpdate, FRONT_DESK),
        (Action::PatientSetStatus, FRONT_DESK),
        (Action::PatientDelete, ADMIN_ONLY),
        (Action::PatientRestore, ADMIN_ONLY),
        (Action::PatientStats, ALL_STAFF),
        (Action::VisitCreate, CLINICAL),
        (Action::VisitRead, ALL_STAFF),
        (Action::VisitUpdate, CLINICAL),
        (Action::VisitLock, PRESCRIBERS),
        (Action::PrescriptionCreate, PRESCRIBERS),
        (Action::PrescriptionRead, CLINICAL),
        (Action::PrescriptionUpdate, PRESCRIBERS),
        (Action::PrescriptionDiscontinue, PRESCRIBERS),
        (Action::PrescriptionComplete, CLINICAL),
        (Action::InvoiceCreate, BILLING_DESK),
        (Action::InvoiceUpdate, BILLING_DESK),
        (Action::InvoiceRead, BILLING_DESK),
        (Action::InvoiceDiscount, BILLING_ONLY),
        (Action::InvoicePayment, BILLING_DESK),
        (Action::InvoiceRefund, BILLING_ONLY),
        (Action::AuditRead, ADMIN_ONLY),
    ])
});

/// Resolves the caller's credential pair into a per-request context.
/// A missing actor or an unknown role is an authentication failure, kept
/// distinct from the authorization failures below.
pub fn authenticate(actor: &str, role: &str) -> EmrResult<ActorContext> {
    if actor.trim().is_empty() {
        return Err(EmrError::Authentication("missing actor id".to_string()));
    }
    let role = Role::from_str(role)
        .map_err(|_| EmrError::Authentication(format!("unknown role '{}'", role)))?;
    Ok(ActorContext::new(actor.trim(), role))
}

/// Fails closed: an action absent from the table is denied for everyone.
pub fn authorize(ctx: &ActorContext, action: Action) -> EmrResult<()> {
    let permitted = PERMISSIONS
        .get(&action)
        .map(|roles| roles.contains(&ctx.role))
        .unwrap_or(false);
    if permitted {
        Ok(())
    } else {
        Err(EmrError::Authorization(format!(
            "role {} may not perform {:?}",
            ctx.role, action
        )))
    }
}
