// models/src/lib.rs

pub mod audit;
pub mod errors;
pub mod invoice;
pub mod pagination;
pub mod patient;
pub mod prescription;
pub mod roles;
pub mod visit;

pub use audit::{AuditAction, AuditEntry, AuditFilter};
pub use errors::{EmrError, EmrResult, ValidationError, ValidationResult};
pub use invoice::{
    Invoice, InvoiceInput, InvoiceStatus, LineItem, LineItemInput, Payment, PaymentMethod, Refund,
};
pub use pagination::{Page, PageMeta, PageRequest};
pub use patient::{
    EmergencyContact, Gender, Insurance, Patient, PatientCode, PatientInput, PatientPatch,
    PatientSearchRow, PatientStats, PatientStatus,
};
pub use prescription::{
    AllergyWarning, Prescription, PrescriptionInput, PrescriptionPatch, PrescriptionStatus,
};
pub use roles::{ActorContext, Role};
pub use visit::{Diagnosis, FollowUp, SoapNote, Visit, VisitInput, VisitUpdate, Vitals};
