// server/src/cli/handlers_patient.rs
use std::str::FromStr;

use models::errors::EmrResult;
use models::patient::{PatientInput, PatientPatch, PatientStatus};
use models::roles::ActorContext;
use services::access::{authorize, Action};
use services::patients::PatientSearch;

use crate::cli::cli::AppServices;
use crate::cli::commands::PatientCommand;
use crate::cli::handlers_utils::{page_request, parse_date, render};

pub async fn handle_patient_command(
    services: &AppServices,
    ctx: &ActorContext,
    action: PatientCommand,
) -> String {
    dispatch(services, ctx, action)
        .await
        .unwrap_or_else(|e| format!("Error: {}", e))
}

async fn dispatch(
    services: &AppServices,
    ctx: &ActorContext,
    action: PatientCommand,
) -> EmrResult<String> {
    match action {
        PatientCommand::Register {
            first_name,
            last_name,
            dob,
            gender,
            phone,
            email,
            address,
            blood_type,
            allergies,
            conditions,
            medications,
            notes,
        } => {
            authorize(ctx, Action::PatientCreate)?;
            let input = PatientInput {
                first_name,
                last_name,
                date_of_birth: Some(parse_date("dob", &dob)?),
                gender: Some(FromStr::from_str(&gender)?),
                phone,
                email,
                address,
                blood_type,
                allergies: Some(allergies),
                chronic_conditions: Some(conditions),
                current_medications: Some(medications),
                notes,
                ..Default::default()
            };
            let patient = services.patients.register(&ctx.actor_id, input).await?;
            Ok(render(&patient))
        }
        PatientCommand::Search {
            query,
            status,
            page,
            limit,
        } => {
            authorize(ctx, Action::PatientRead)?;
            let status = match status {
                Some(s) => Some(PatientStatus::from_str(&s)?),
                None => None,
            };
            let results = services
                .patients
                .search(PatientSearch {
                    query,
                    status,
                    page: page_request(page, limit),
                })
                .await?;
            Ok(render(&results))
        }
        PatientCommand::View { id } => {
            authorize(ctx, Action::PatientRead)?;
            Ok(render(&services.patients.get_by_id(id).await?))
        }
        PatientCommand::ViewCode { code } => {
            authorize(ctx, Action::PatientRead)?;
            Ok(render(&services.patients.get_by_code(&code).await?))
        }
        PatientCommand::Update {
            id,
            first_name,
            last_name,
            dob,
            gender,
            phone,
            email,
            address,
            blood_type,
            allergies,
            notes,
        } => {
            authorize(ctx, Action::PatientUpdate)?;
            let patch = PatientPatch {
                first_name,
                last_name,
                date_of_birth: match dob {
                    Some(d) => Some(parse_date("dob", &d)?),
                    None => None,
                },
                gender: match gender {
                    Some(g) => Some(FromStr::from_str(&g)?),
                    None => None,
                },
                phone,
                email,
                address,
                blood_type,
                allergies: if allergies.is_empty() {
                    None
                } else {
                    Some(allergies)
                },
                notes,
                ..Default::default()
            };
            let patient = services.patients.update(&ctx.actor_id, id, patch).await?;
            Ok(render(&patient))
        }
        PatientCommand::SetStatus { id, status } => {
            authorize(ctx, Action::PatientSetStatus)?;
            let status = PatientStatus::from_str(&status)?;
            let patient = services.patients.set_status(&ctx.actor_id, id, status).await?;
            Ok(render(&patient))
        }
        PatientCommand::Delete { id } => {
            authorize(ctx, Action::PatientDelete)?;
            let patient = services.patients.soft_delete(&ctx.actor_id, id).await?;
            Ok(render(&patient))
        }
        PatientCommand::Restore { id } => {
            authorize(ctx, Action::PatientRestore)?;
            let patient = services.patients.restore(&ctx.actor_id, id).await?;
            Ok(render(&patient))
        }
        PatientCommand::Stats => {
            authorize(ctx, Action::PatientStats)?;
            Ok(render(&services.patients.stats().await?))
        }
    }
}
