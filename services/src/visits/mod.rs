// services/src/visits/mod.rs

pub mod ledger;

pub use ledger::{VisitLedger, VisitSearch};
