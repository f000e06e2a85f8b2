// services/src/prescriptions/mod.rs

pub mod tracker;

pub use tracker::{PrescriptionCreated, PrescriptionSearch, PrescriptionTracker};
