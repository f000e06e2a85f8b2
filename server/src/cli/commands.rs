// server/src/cli/commands.rs
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "clinicdb", version, about = "Clinic EMR domain services")]
pub struct CliArgs {
    /// Acting staff member id, recorded in the audit trail.
    #[arg(long, global = true, default_value = "admin")]
    pub actor: String,
    /// Role of the acting staff member (ADMIN, DOCTOR, NURSE,
    /// RECEPTIONIST, BILLING).
    #[arg(long, global = true, default_value = "ADMIN")]
    pub role: String,
    /// Path to a YAML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Use the ephemeral in-memory store instead of the configured engine.
    #[arg(long, global = true)]
    pub ephemeral: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Patient registry: registration, search, lifecycle.
    #[command(subcommand)]
    Patient(PatientCommand),
    /// Visit ledger: encounters, SOAP notes, locking.
    #[command(subcommand)]
    Visit(VisitCommand),
    /// Prescription tracker: orders and discontinuation.
    #[command(subcommand)]
    Prescription(PrescriptionCommand),
    /// Invoice ledger: billing, discounts, payments, refunds.
    #[command(subcommand)]
    Invoice(InvoiceCommand),
    /// Audit trail reporting.
    #[command(subcommand)]
    Audit(AuditCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum PatientCommand {
    Register {
        first_name: String,
        last_name: String,
        /// Date of birth, YYYY-MM-DD.
        dob: String,
        /// MALE, FEMALE or OTHER.
        gender: String,
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        blood_type: Option<String>,
        /// Repeatable.
        #[arg(long = "allergy")]
        allergies: Vec<String>,
        /// Repeatable.
        #[arg(long = "condition")]
        conditions: Vec<String>,
        /// Repeatable.
        #[arg(long = "medication")]
        medications: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    View {
        id: Uuid,
    },
    ViewCode {
        code: String,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        dob: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        blood_type: Option<String>,
        /// Repeatable; replaces the stored list when supplied.
        #[arg(long = "allergy")]
        allergies: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    SetStatus {
        id: Uuid,
        /// ACTIVE or INACTIVE.
        status: String,
    },
    Delete {
        id: Uuid,
    },
    Restore {
        id: Uuid,
    },
    Stats,
}

#[derive(Subcommand, Debug, Clone)]
pub enum VisitCommand {
    Create {
        patient_id: Uuid,
        provider_id: Uuid,
        /// CONSULTATION, FOLLOW_UP, EMERGENCY, ... (free string).
        visit_type: String,
        #[arg(long)]
        chief_complaint: Option<String>,
        /// RFC 3339 timestamp; defaults to now.
        #[arg(long)]
        occurred_at: Option<String>,
        #[arg(long)]
        systolic: Option<u16>,
        #[arg(long)]
        diastolic: Option<u16>,
        #[arg(long)]
        heart_rate: Option<u16>,
        #[arg(long)]
        respiratory_rate: Option<u16>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        spo2: Option<u8>,
        #[arg(long)]
        weight: Option<f32>,
        #[arg(long)]
        height: Option<f32>,
        #[arg(long)]
        pain: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        chief_complaint: Option<String>,
        #[arg(long)]
        systolic: Option<u16>,
        #[arg(long)]
        diastolic: Option<u16>,
        #[arg(long)]
        heart_rate: Option<u16>,
        #[arg(long)]
        respiratory_rate: Option<u16>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        spo2: Option<u8>,
        #[arg(long)]
        weight: Option<f32>,
        #[arg(long)]
        height: Option<f32>,
        #[arg(long)]
        pain: Option<u8>,
        #[arg(long)]
        subjective: Option<String>,
        #[arg(long)]
        objective: Option<String>,
        #[arg(long)]
        assessment: Option<String>,
        #[arg(long)]
        plan: Option<String>,
        #[arg(long)]
        primary_diagnosis: Option<String>,
        /// Repeatable.
        #[arg(long = "secondary-diagnosis")]
        secondary_diagnoses: Vec<String>,
        /// Repeatable.
        #[arg(long = "icd10")]
        icd10_codes: Vec<String>,
        /// YYYY-MM-DD.
        #[arg(long)]
        follow_up_date: Option<String>,
        #[arg(long)]
        follow_up_reason: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Lock {
        id: Uuid,
    },
    View {
        id: Uuid,
    },
    Search {
        #[arg(long)]
        patient_id: Option<Uuid>,
        #[arg(long)]
        provider_id: Option<Uuid>,
        #[arg(long)]
        visit_type: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PrescriptionCommand {
    Create {
        patient_id: Uuid,
        provider_id: Uuid,
        medication: String,
        dosage: String,
        frequency: String,
        route: String,
        duration: String,
        quantity: u32,
        #[arg(long)]
        visit_id: Option<Uuid>,
        #[arg(long)]
        generic_name: Option<String>,
        #[arg(long)]
        brand_name: Option<String>,
        /// 0..=12.
        #[arg(long)]
        refills: Option<u8>,
        #[arg(long)]
        instructions: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        medication: Option<String>,
        #[arg(long)]
        dosage: Option<String>,
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long)]
        route: Option<String>,
        #[arg(long)]
        duration: Option<String>,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        refills: Option<u8>,
        #[arg(long)]
        instructions: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Discontinue {
        id: Uuid,
        reason: String,
        #[arg(long)]
        notes: Option<String>,
    },
    Complete {
        id: Uuid,
    },
    View {
        id: Uuid,
    },
    Search {
        #[arg(long)]
        patient_id: Option<Uuid>,
        /// ACTIVE, DISCONTINUED or COMPLETED.
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum InvoiceCommand {
    Create {
        patient_id: Uuid,
        /// Repeatable line item, `description:quantity:unit_price`.
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        #[arg(long)]
        visit_id: Option<Uuid>,
        #[arg(long)]
        discount_amount: Option<Decimal>,
        #[arg(long)]
        discount_percent: Option<Decimal>,
        #[arg(long)]
        discount_reason: Option<String>,
        /// Percentage, 0..=100.
        #[arg(long)]
        tax_rate: Option<Decimal>,
        #[arg(long)]
        notes: Option<String>,
    },
    Discount {
        id: Uuid,
        reason: String,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        percent: Option<Decimal>,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        notes: Option<String>,
    },
    Pay {
        id: Uuid,
        amount: Decimal,
        /// CASH, CARD, MOBILE, BANK_TRANSFER, CHECK or INSURANCE.
        method: String,
        #[arg(long)]
        receipt_no: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Refund {
        id: Uuid,
        amount: Decimal,
        reason: String,
        #[arg(long)]
        notes: Option<String>,
    },
    View {
        id: Uuid,
    },
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        patient_id: Option<Uuid>,
        #[arg(long)]
        visit_id: Option<Uuid>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AuditCommand {
    Search {
        #[arg(long)]
        actor: Option<String>,
        /// CREATE, UPDATE, SOFT_DELETE, PAYMENT, ...
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        entity_type: Option<String>,
        #[arg(long)]
        entity_id: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}
