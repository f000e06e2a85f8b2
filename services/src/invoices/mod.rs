// services/src/invoices/mod.rs

pub mod ledger;

pub use ledger::{InvoiceLedger, InvoiceSearch};
