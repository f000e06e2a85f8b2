// server/src/cli/cli.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use models::roles::ActorContext;
use services::audit::AuditService;
use services::invoices::InvoiceLedger;
use services::patients::PatientRegistry;
use services::prescriptions::PrescriptionTracker;
use services::visits::VisitLedger;
use storage::{load_config, open_storage, EmrStorage, StorageEngineKind};

use crate::cli::commands::{CliArgs, Commands};
use crate::cli::{
    handlers_audit, handlers_invoice, handlers_patient, handlers_prescription, handlers_visit,
};

/// Everything a handler needs to serve one request.
pub struct AppServices {
    pub patients: PatientRegistry,
    pub visits: VisitLedger,
    pub prescriptions: PrescriptionTracker,
    pub invoices: InvoiceLedger,
    pub audit: Arc<AuditService>,
    pub storage: Arc<dyn EmrStorage>,
}

impl AppServices {
    pub async fn build(storage: Arc<dyn EmrStorage>) -> Result<Self> {
        let audit = AuditService::new(storage.clone()).await?;
        Ok(AppServices {
            patients: PatientRegistry::new(storage.clone(), audit.clone()),
            visits: VisitLedger::new(storage.clone(), audit.clone()),
            prescriptions: PrescriptionTracker::new(storage.clone(), audit.clone()),
            invoices: InvoiceLedger::new(storage.clone(), audit.clone()),
            audit,
            storage,
        })
    }
}

pub async fn start_cli() -> Result<()> {
    let args = CliArgs::parse();

    let ctx: ActorContext = services::access::authenticate(&args.actor, &args.role)
        .context("could not authenticate caller")?;
    debug!("acting as {} ({})", ctx.actor_id, ctx.role);

    let mut config = load_config(args.config.as_deref())?;
    if args.ephemeral {
        config.engine = StorageEngineKind::Memory;
    }
    let storage = open_storage(&config)?;
    let services = AppServices::build(storage.clone()).await?;

    let output = match args.command {
        Commands::Patient(cmd) => {
            handlers_patient::handle_patient_command(&services, &ctx, cmd).await
        }
        Commands::Visit(cmd) => handlers_visit::handle_visit_command(&services, &ctx, cmd).await,
        Commands::Prescription(cmd) => {
            handlers_prescription::handle_prescription_command(&services, &ctx, cmd).await
        }
        Commands::Invoice(cmd) => {
            handlers_invoice::handle_invoice_command(&services, &ctx, cmd).await
        }
        Commands::Audit(cmd) => handlers_audit::handle_audit_command(&services, &ctx, cmd).await,
    };

    println!("{}", output);
    storage.flush().await?;
    Ok(())
}
