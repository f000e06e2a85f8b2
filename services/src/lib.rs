// services/src/lib.rs

pub mod access;
pub mod allergy;
pub mod audit;
pub mod invoices;
pub mod patients;
pub mod prescriptions;
mod validate;
pub mod visits;

pub use access::{authenticate, authorize, Action};
pub use allergy::allergy_warnings;
pub use audit::AuditService;
pub use invoices::{InvoiceLedger, InvoiceSearch};
pub use patients::{PatientRegistry, PatientSearch};
pub use prescriptions::{PrescriptionCreated, PrescriptionSearch, PrescriptionTracker};
pub use visits::{VisitLedger, VisitSearch};
