// server/src/cli/mod.rs

pub mod cli;
pub mod commands;
pub mod handlers_audit;
pub mod handlers_invoice;
pub mod handlers_patient;
pub mod handlers_prescription;
pub mod handlers_utils;
pub mod handlers_visit;
