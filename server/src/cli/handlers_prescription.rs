// server/src/cli/handlers_prescription.rs
use std::str::FromStr;

use models::errors::EmrResult;
use models::prescription::{PrescriptionInput, PrescriptionPatch, PrescriptionStatus};
use models::roles::ActorContext;
use services::access::{authorize, Action};
use services::prescriptions::PrescriptionSearch;

use crate::cli::cli::AppServices;
use crate::cli::commands::PrescriptionCommand;
use crate::cli::handlers_utils::{page_request, render};

pub async fn handle_prescription_command(
    services: &AppServices,
    ctx: &ActorContext,
    action: PrescriptionCommand,
) -> String {
    dispatch(services, ctx, action)
        .await
        .unwrap_or_else(|e| format!("Error: {}", e))
}

async fn dispatch(
    services: &AppServices,
    ctx: &ActorContext,
    action: PrescriptionCommand,
) -> EmrResult<String> {
    match action {
        PrescriptionCommand::Create {
            patient_id,
            provider_id,
            medication,
            dosage,
            frequency,
            route,
            duration,
            quantity,
            visit_id,
            generic_name,
            brand_name,
            refills,
            instructions,
            notes,
        } => {
            authorize(ctx, Action::PrescriptionCreate)?;
            let input = PrescriptionInput {
                patient_id,
                visit_id,
                provider_id,
                medication_name: medication,
                generic_name,
                brand_name,
                dosage,
                frequency,
                route,
                duration,
                quantity,
                refills,
                instructions,
                notes,
            };
            let created = services.prescriptions.create(&ctx.actor_id, input).await?;
            Ok(render(&created))
        }
        PrescriptionCommand::Update {
            id,
            medication,
            dosage,
            frequency,
            route,
            duration,
            quantity,
            refills,
            instructions,
            notes,
        } => {
            authorize(ctx, Action::PrescriptionUpdate)?;
            let patch = PrescriptionPatch {
                medication_name: medication,
                dosage,
                frequency,
                route,
                duration,
                quantity,
                refills,
                instructions,
                notes,
                ..Default::default()
            };
            let updated = services
                .prescriptions
                .update(&ctx.actor_id, id, patch)
                .await?;
            Ok(render(&updated))
        }
        PrescriptionCommand::Discontinue { id, reason, notes } => {
            authorize(ctx, Action::PrescriptionDiscontinue)?;
            let discontinued = services
                .prescriptions
                .discontinue(&ctx.actor_id, id, &reason, notes)
                .await?;
            Ok(render(&discontinued))
        }
        PrescriptionCommand::Complete { id } => {
            authorize(ctx, Action::PrescriptionComplete)?;
            Ok(render(
                &services.prescriptions.complete(&ctx.actor_id, id).await?,
            ))
        }
        PrescriptionCommand::View { id } => {
            authorize(ctx, Action::PrescriptionRead)?;
            Ok(render(&services.prescriptions.get(id).await?))
        }
        PrescriptionCommand::Search {
            patient_id,
            status,
            query,
            page,
            limit,
        } => {
            authorize(ctx, Action::PrescriptionRead)?;
            let status = match status {
                Some(s) => Some(PrescriptionStatus::from_str(&s)?),
                None => None,
            };
            let results = services
                .prescriptions
                .search(PrescriptionSearch {
                    patient_id,
                    status,
                    query,
                    page: page_request(page, limit),
                })
                .await?;
            Ok(render(&results))
        }
    }
}
