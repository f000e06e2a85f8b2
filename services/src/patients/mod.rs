// services/src/patients/mod.rs

pub mod registry;

pub use registry::{PatientRegistry, PatientSearch};
