// server/src/cli/handlers_invoice.rs
use std::str::FromStr;

use models::errors::EmrResult;
use models::invoice::{InvoiceInput, InvoiceStatus, PaymentMethod};
use models::roles::ActorContext;
use services::access::{authorize, Action};
use services::invoices::InvoiceSearch;

use crate::cli::cli::AppServices;
use crate::cli::commands::InvoiceCommand;
use crate::cli::handlers_utils::{page_request, parse_line_item, render};

pub async fn handle_invoice_command(
    services: &AppServices,
    ctx: &ActorContext,
    action: InvoiceCommand,
) -> String {
    dispatch(services, ctx, action)
        .await
        .unwrap_or_else(|e| format!("Error: {}", e))
}

async fn dispatch(
    services: &AppServices,
    ctx: &ActorContext,
    action: InvoiceCommand,
) -> EmrResult<String> {
    match action {
        InvoiceCommand::Create {
            patient_id,
            items,
            visit_id,
            discount_amount,
            discount_percent,
            discount_reason,
            tax_rate,
            notes,
        } => {
            authorize(ctx, Action::InvoiceCreate)?;
            let line_items = items
                .iter()
                .map(|raw| parse_line_item(raw))
                .collect::<EmrResult<Vec<_>>>()?;
            let input = InvoiceInput {
                patient_id,
                visit_id,
                line_items,
                discount_amount,
                discount_percent,
                discount_reason,
                tax_rate,
                notes,
            };
            let invoice = services.invoices.create(&ctx.actor_id, input).await?;
            Ok(render(&invoice))
        }
        InvoiceCommand::Discount {
            id,
            reason,
            amount,
            percent,
        } => {
            authorize(ctx, Action::InvoiceDiscount)?;
            let invoice = services
                .invoices
                .apply_discount(&ctx.actor_id, id, amount, percent, &reason)
                .await?;
            Ok(render(&invoice))
        }
        InvoiceCommand::Update { id, notes } => {
            authorize(ctx, Action::InvoiceUpdate)?;
            let invoice = services.invoices.update(&ctx.actor_id, id, notes).await?;
            Ok(render(&invoice))
        }
        InvoiceCommand::Pay {
            id,
            amount,
            method,
            receipt_no,
            notes,
        } => {
            authorize(ctx, Action::InvoicePayment)?;
            let method = PaymentMethod::from_str(&method)?;
            let invoice = services
                .invoices
                .record_payment(&ctx.actor_id, id, amount, method, receipt_no, notes)
                .await?;
            Ok(render(&invoice))
        }
        InvoiceCommand::Refund {
            id,
            amount,
            reason,
            notes,
        } => {
            authorize(ctx, Action::InvoiceRefund)?;
            let invoice = services
                .invoices
                .record_refund(&ctx.actor_id, id, amount, &reason, notes)
                .await?;
            Ok(render(&invoice))
        }
        InvoiceCommand::View { id } => {
            authorize(ctx, Action::InvoiceRead)?;
            Ok(render(&services.invoices.get(id).await?))
        }
        InvoiceCommand::Search {
            query,
            status,
            patient_id,
            visit_id,
            page,
            limit,
        } => {
            authorize(ctx, Action::InvoiceRead)?;
            let status = match status {
                Some(s) => Some(InvoiceStatus::from_str(&s)?),
                None => None,
            };
            let results = services
                .invoices
                .search(InvoiceSearch {
                    query,
                    status,
                    patient_id,
                    visit_id,
                    from: None,
                    to: None,
                    page: page_request(page, limit),
                })
                .await?;
            Ok(render(&results))
        }
    }
}
