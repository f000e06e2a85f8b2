// server/src/cli/handlers_visit.rs
use models::errors::EmrResult;
use models::roles::ActorContext;
use models::visit::{Diagnosis, FollowUp, SoapNote, VisitInput, VisitUpdate, Vitals};
use services::access::{authorize, Action};
use services::visits::VisitSearch;

use crate::cli::cli::AppServices;
use crate::cli::commands::VisitCommand;
use crate::cli::handlers_utils::{page_request, parse_date, parse_datetime, render};

pub async fn handle_visit_command(
    services: &AppServices,
    ctx: &ActorContext,
    action: VisitCommand,
) -> String {
    dispatch(services, ctx, action)
        .await
        .unwrap_or_else(|e| format!("Error: {}", e))
}

async fn dispatch(
    services: &AppServices,
    ctx: &ActorContext,
    action: VisitCommand,
) -> EmrResult<String> {
    match action {
        VisitCommand::Create {
            patient_id,
            provider_id,
            visit_type,
            chief_complaint,
            occurred_at,
            systolic,
            diastolic,
            heart_rate,
            respiratory_rate,
            temperature,
            spo2,
            weight,
            height,
            pain,
            notes,
        } => {
            authorize(ctx, Action::VisitCreate)?;
            let vitals = Vitals {
                systolic_bp: systolic,
                diastolic_bp: diastolic,
                heart_rate,
                respiratory_rate,
                temperature_c: temperature,
                spo2,
                weight_kg: weight,
                height_cm: height,
                pain_scale: pain,
            };
            let input = VisitInput {
                patient_id,
                provider_id,
                visit_type,
                occurred_at: match occurred_at {
                    Some(ts) => Some(parse_datetime("occurred_at", &ts)?),
                    None => None,
                },
                chief_complaint,
                vitals: (vitals != Vitals::default()).then_some(vitals),
                notes,
                ..Default::default()
            };
            let visit = services.visits.create(&ctx.actor_id, input).await?;
            Ok(render(&visit))
        }
        VisitCommand::Update {
            id,
            chief_complaint,
            systolic,
            diastolic,
            heart_rate,
            respiratory_rate,
            temperature,
            spo2,
            weight,
            height,
            pain,
            subjective,
            objective,
            assessment,
            plan,
            primary_diagnosis,
            secondary_diagnoses,
            icd10_codes,
            follow_up_date,
            follow_up_reason,
            notes,
        } => {
            authorize(ctx, Action::VisitUpdate)?;

            // Sections are replaced wholesale by the service, so merge the
            // flags into the current record first.
            let current = services.visits.get(id).await?;

            let vitals = if systolic.is_some()
                || diastolic.is_some()
                || heart_rate.is_some()
                || respiratory_rate.is_some()
                || temperature.is_some()
                || spo2.is_some()
                || weight.is_some()
                || height.is_some()
                || pain.is_some()
            {
                let mut vitals = current.vitals.unwrap_or_default();
                vitals.systolic_bp = systolic.or(vitals.systolic_bp);
                vitals.diastolic_bp = diastolic.or(vitals.diastolic_bp);
                vitals.heart_rate = heart_rate.or(vitals.heart_rate);
                vitals.respiratory_rate = respiratory_rate.or(vitals.respiratory_rate);
                vitals.temperature_c = temperature.or(vitals.temperature_c);
                vitals.spo2 = spo2.or(vitals.spo2);
                vitals.weight_kg = weight.or(vitals.weight_kg);
                vitals.height_cm = height.or(vitals.height_cm);
                vitals.pain_scale = pain.or(vitals.pain_scale);
                Some(vitals)
            } else {
                None
            };

            let soap = if subjective.is_some()
                || objective.is_some()
                || assessment.is_some()
                || plan.is_some()
            {
                Some(SoapNote {
                    subjective: subjective.or(current.soap.subjective),
                    objective: objective.or(current.soap.objective),
                    assessment: assessment.or(current.soap.assessment),
                    plan: plan.or(current.soap.plan),
                })
            } else {
                None
            };

            let diagnosis = if primary_diagnosis.is_some()
                || !secondary_diagnoses.is_empty()
                || !icd10_codes.is_empty()
            {
                Some(Diagnosis {
                    primary: primary_diagnosis.or(current.diagnosis.primary),
                    secondary: if secondary_diagnoses.is_empty() {
                        current.diagnosis.secondary
                    } else {
                        secondary_diagnoses
                    },
                    icd10_codes: if icd10_codes.is_empty() {
                        current.diagnosis.icd10_codes
                    } else {
                        icd10_codes
                    },
                })
            } else {
                None
            };

            let follow_up = match follow_up_date {
                Some(date) => Some(FollowUp {
                    date: parse_date("follow_up_date", &date)?,
                    reason: follow_up_reason,
                }),
                None => None,
            };

            let update = VisitUpdate {
                chief_complaint,
                vitals,
                soap,
                diagnosis,
                follow_up,
                notes,
            };
            let visit = services.visits.update(&ctx.actor_id, id, update).await?;
            Ok(render(&visit))
        }
        VisitCommand::Lock { id } => {
            authorize(ctx, Action::VisitLock)?;
            Ok(render(&services.visits.lock(&ctx.actor_id, id).await?))
        }
        VisitCommand::View { id } => {
            authorize(ctx, Action::VisitRead)?;
            Ok(render(&services.visits.get(id).await?))
        }
        VisitCommand::Search {
            patient_id,
            provider_id,
            visit_type,
            page,
            limit,
        } => {
            authorize(ctx, Action::VisitRead)?;
            let results = services
                .visits
                .search(VisitSearch {
                    patient_id,
                    provider_id,
                    visit_type,
                    from: None,
                    to: None,
                    page: page_request(page, limit),
                })
                .await?;
            Ok(render(&results))
        }
    }
}
