// server/src/cli/handlers_audit.rs
use std::str::FromStr;

use models::audit::{AuditAction, AuditFilter};
use models::errors::EmrResult;
use models::roles::ActorContext;
use services::access::{authorize, Action};

use crate::cli::cli::AppServices;
use crate::cli::commands::AuditCommand;
use crate::cli::handlers_utils::render;

pub async fn handle_audit_command(
    services: &AppServices,
    ctx: &ActorContext,
    action: AuditCommand,
) -> String {
    dispatch(services, ctx, action)
        .await
        .unwrap_or_else(|e| format!("Error: {}", e))
}

async fn dispatch(
    services: &AppServices,
    ctx: &ActorContext,
    action: AuditCommand,
) -> EmrResult<String> {
    match action {
        AuditCommand::Search {
            actor,
            action: audit_action,
            entity_type,
            entity_id,
            offset,
            limit,
        } => {
            authorize(ctx, Action::AuditRead)?;
            let action = match audit_action {
                Some(a) => Some(AuditAction::from_str(&a)?),
                None => None,
            };
            let entries = services
                .audit
                .search(AuditFilter {
                    actor,
                    action,
                    entity_type,
                    entity_id,
                    since_nanos: None,
                    until_nanos: None,
                    offset,
                    limit,
                })
                .await?;
            Ok(render(&entries))
        }
    }
}
