// services/src/invoices/ledger.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use log::info;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use models::audit::AuditAction;
use models::errors::{EmrError, EmrResult, ValidationError};
use models::invoice::{
    compute_totals, derive_status, invoice_number, invoice_number_prefix, line_total,
    validate_discount, Invoice, InvoiceInput, InvoiceStatus, LineItem, Payment, PaymentMethod,
    Refund,
};
use models::pagination::{Page, PageRequest};
use storage::EmrStorage;

use crate::audit::AuditService;
use crate::validate::require;

const ENTITY: &str = "invoice";

#[derive(Debug, Clone, Default)]
pub struct InvoiceSearch {
    /// Matched case-insensitively against the invoice number and the
    /// patient's name.
    pub query: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<Uuid>,
    pub visit_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

/// Computes line-item totals, applies discount and tax, and tracks the
/// append-only payment/refund ledger each invoice settles against.
pub struct InvoiceLedger {
    storage: Arc<dyn EmrStorage>,
    audit: Arc<AuditService>,
}

impl InvoiceLedger {
    pub fn new(storage: Arc<dyn EmrStorage>, audit: Arc<AuditService>) -> Self {
        InvoiceLedger { storage, audit }
    }

    pub async fn create(&self, actor: &str, input: InvoiceInput) -> EmrResult<Invoice> {
        if input.line_items.is_empty() {
            return Err(ValidationError::missing("line_items").into());
        }

        let patient = self
            .storage
            .get_patient(input.patient_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| EmrError::NotFound(format!("patient {}", input.patient_id)))?;
        if let Some(visit_id) = input.visit_id {
            self.storage
                .get_visit(visit_id)
                .await?
                .ok_or_else(|| EmrError::NotFound(format!("visit {}", visit_id)))?;
        }

        // Totals are always derived here; a caller-supplied figure is only
        // accepted as a checksum.
        let mut line_items = Vec::with_capacity(input.line_items.len());
        for (index, item) in input.line_items.into_iter().enumerate() {
            require("description", &item.description)?;
            if item.unit_price < Decimal::ZERO {
                return Err(ValidationError::out_of_range(
                    "unit_price",
                    format!("must not be negative, got {}", item.unit_price),
                )
                .into());
            }
            let computed = line_total(item.quantity, item.unit_price);
            if let Some(supplied) = item.total {
                if supplied != computed {
                    return Err(
                        ValidationError::LineTotalMismatch(index, supplied, computed).into(),
                    );
                }
            }
            line_items.push(LineItem {
                description: item.description.trim().to_string(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                total: computed,
            });
        }

        validate_discount(
            input.discount_amount,
            input.discount_percent,
            input.discount_reason.as_deref(),
        )?;
        let tax_rate = input.tax_rate.unwrap_or(Decimal::ZERO);
        let line_totals: Vec<Decimal> = line_items.iter().map(|l| l.total).collect();
        let totals = compute_totals(
            &line_totals,
            input.discount_amount,
            input.discount_percent,
            tax_rate,
        )?;

        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number: self.next_invoice_number().await?,
            patient_id: patient.id,
            visit_id: input.visit_id,
            line_items,
            discount_amount: input.discount_amount,
            discount_percent: input.discount_percent,
            discount_reason: input.discount_reason,
            tax_rate,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            grand_total: totals.grand_total,
            notes: input.notes,
            status: derive_status(totals.grand_total, Decimal::ZERO, Decimal::ZERO),
            payments: vec![],
            refunds: vec![],
            created_at: now,
            updated_at: now,
        };

        self.storage.put_invoice(&invoice).await?;
        info!(
            "created invoice {} for patient {} (total {})",
            invoice.invoice_number, patient.code, invoice.grand_total
        );
        self.audit
            .record(
                actor,
                AuditAction::Create,
                ENTITY,
                invoice.id,
                json!({
                    "invoice_number": invoice.invoice_number,
                    "patient_id": invoice.patient_id,
                    "subtotal": invoice.subtotal,
                    "grand_total": invoice.grand_total,
                    "line_items": invoice.line_items.len(),
                }),
            )
            .await;
        Ok(invoice)
    }

    pub async fn get(&self, id: Uuid) -> EmrResult<Invoice> {
        self.storage
            .get_invoice(id)
            .await?
            .ok_or_else(|| EmrError::NotFound(format!("invoice {}", id)))
    }

    /// Amends the discount before settlement and recomputes every derived
    /// figure. The reason is mandatory.
    pub async fn apply_discount(
        &self,
        actor: &str,
        id: Uuid,
        amount: Option<Decimal>,
        percent: Option<Decimal>,
        reason: &str,
    ) -> EmrResult<Invoice> {
        require("discount_reason", reason)?;
        validate_discount(amount, percent, Some(reason))?;

        let mut invoice = self.get(id).await?;
        if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Refunded) {
            return Err(EmrError::BusinessRule(format!(
                "invoice {} is already settled ({})",
                invoice.invoice_number, invoice.status
            )));
        }

        invoice.discount_amount = amount;
        invoice.discount_percent = percent;
        invoice.discount_reason = Some(reason.trim().to_string());

        let line_totals: Vec<Decimal> = invoice.line_items.iter().map(|l| l.total).collect();
        let totals = compute_totals(&line_totals, amount, percent, invoice.tax_rate)?;
        invoice.subtotal = totals.subtotal;
        invoice.tax_amount = totals.tax_amount;
        invoice.grand_total = totals.grand_total;
        invoice.status = derive_status(
            invoice.grand_total,
            invoice.payments_total(),
            invoice.refunds_total(),
        );
        invoice.updated_at = Utc::now();

        self.storage.put_invoice(&invoice).await?;
        self.audit
            .record(
                actor,
                AuditAction::Discount,
                ENTITY,
                invoice.id,
                json!({
                    "discount_amount": amount,
                    "discount_percent": percent,
                    "reason": invoice.discount_reason,
                    "grand_total": invoice.grand_total,
                }),
            )
            .await;
        Ok(invoice)
    }

    /// Non-financial amendment; the money fields only move through the
    /// discount/payment/refund operations.
    pub async fn update(&self, actor: &str, id: Uuid, notes: Option<String>) -> EmrResult<Invoice> {
        let mut invoice = self.get(id).await?;
        if let Some(notes) = notes {
            invoice.notes = Some(notes);
        }
        invoice.updated_at = Utc::now();
        self.storage.put_invoice(&invoice).await?;
        self.audit
            .record(
                actor,
                AuditAction::Update,
                ENTITY,
                invoice.id,
                json!({ "notes": invoice.notes }),
            )
            .await;
        Ok(invoice)
    }

    pub async fn record_payment(
        &self,
        actor: &str,
        id: Uuid,
        amount: Decimal,
        method: PaymentMethod,
        receipt_no: Option<String>,
        notes: Option<String>,
    ) -> EmrResult<Invoice> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount).into());
        }

        let mut invoice = self.get(id).await?;
        let payment = Payment {
            id: Uuid::new_v4(),
            amount: amount.round_dp(2),
            method,
            receipt_no,
            notes,
            recorded_at: Utc::now(),
        };
        invoice.payments.push(payment.clone());
        invoice.status = derive_status(
            invoice.grand_total,
            invoice.payments_total(),
            invoice.refunds_total(),
        );
        invoice.updated_at = Utc::now();

        self.storage.put_invoice(&invoice).await?;
        info!(
            "payment of {} against invoice {} ({})",
            payment.amount, invoice.invoice_number, invoice.status
        );
        self.audit
            .record(
                actor,
                AuditAction::Payment,
                ENTITY,
                invoice.id,
                json!({
                    "amount": payment.amount,
                    "method": payment.method,
                    "status": invoice.status,
                }),
            )
            .await;
        Ok(invoice)
    }

    /// Refunds never exceed what was actually collected.
    pub async fn record_refund(
        &self,
        actor: &str,
        id: Uuid,
        amount: Decimal,
        reason: &str,
        notes: Option<String>,
    ) -> EmrResult<Invoice> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount).into());
        }
        require("reason", reason)?;

        let mut invoice = self.get(id).await?;
        let refundable = invoice.payments_total() - invoice.refunds_total();
        if amount > refundable {
            return Err(EmrError::BusinessRule(format!(
                "refund of {} exceeds the {} still refundable on invoice {}",
                amount, refundable, invoice.invoice_number
            )));
        }

        let refund = Refund {
            id: Uuid::new_v4(),
            amount: amount.round_dp(2),
            reason: reason.trim().to_string(),
            notes,
            recorded_at: Utc::now(),
        };
        invoice.refunds.push(refund.clone());
        invoice.status = derive_status(
            invoice.grand_total,
            invoice.payments_total(),
            invoice.refunds_total(),
        );
        invoice.updated_at = Utc::now();

        self.storage.put_invoice(&invoice).await?;
        info!(
            "refund of {} against invoice {} ({})",
            refund.amount, invoice.invoice_number, invoice.status
        );
        self.audit
            .record(
                actor,
                AuditAction::Refund,
                ENTITY,
                invoice.id,
                json!({
                    "amount": refund.amount,
                    "reason": refund.reason,
                    "status": invoice.status,
                }),
            )
            .await;
        Ok(invoice)
    }

    pub async fn search(&self, criteria: InvoiceSearch) -> EmrResult<Page<Invoice>> {
        let mut invoices = self.storage.all_invoices().await?;

        if let Some(patient_id) = criteria.patient_id {
            invoices.retain(|i| i.patient_id == patient_id);
        }
        if let Some(visit_id) = criteria.visit_id {
            invoices.retain(|i| i.visit_id == Some(visit_id));
        }
        if let Some(status) = criteria.status {
            invoices.retain(|i| i.status == status);
        }
        if let Some(from) = criteria.from {
            invoices.retain(|i| i.created_at >= from);
        }
        if let Some(to) = criteria.to {
            invoices.retain(|i| i.created_at <= to);
        }
        if let Some(ref query) = criteria.query {
            let token = query.trim().to_lowercase();
            if !token.is_empty() {
                let names: HashMap<Uuid, String> = self
                    .storage
                    .all_patients()
                    .await?
                    .into_iter()
                    .map(|p| (p.id, p.display_name().to_lowercase()))
                    .collect();
                invoices.retain(|i| {
                    i.invoice_number.to_lowercase().contains(&token)
                        || names
                            .get(&i.patient_id)
                            .map(|name| name.contains(&token))
                            .unwrap_or(false)
                });
            }
        }

        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_vec(invoices, criteria.page))
    }

    /// Same year-bucket numbering scheme as patient codes.
    async fn next_invoice_number(&self) -> EmrResult<String> {
        let year = Utc::now().year();
        let prefix = invoice_number_prefix(year);
        let issued = self
            .storage
            .all_invoices()
            .await?
            .iter()
            .filter(|i| i.invoice_number.starts_with(&prefix))
            .count() as u32;
        Ok(invoice_number(year, issued + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use models::invoice::LineItemInput;
    use models::patient::{Gender, PatientInput};
    use rust_decimal_macros::dec;
    use storage::MemoryStorage;

    use crate::patients::PatientRegistry;

    async fn fixture() -> (InvoiceLedger, PatientRegistry, Arc<dyn EmrStorage>) {
        let storage: Arc<dyn EmrStorage> = Arc::new(MemoryStorage::new());
        let audit = AuditService::new(storage.clone()).await.unwrap();
        (
            InvoiceLedger::new(storage.clone(), audit.clone()),
            PatientRegistry::new(storage.clone(), audit),
            storage,
        )
    }

    async fn registered_patient(registry: &PatientRegistry) -> Uuid {
        registry
            .register(
                "reception",
                PatientInput {
                    first_name: "Ama".to_string(),
                    last_name: "Mensah".to_string(),
                    date_of_birth: NaiveDate::from_ymd_opt(1985, 6, 15),
                    gender: Some(Gender::Female),
                    phone: "+233200000001".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    fn item(description: &str, quantity: u32, unit_price: Decimal) -> LineItemInput {
        LineItemInput {
            description: description.to_string(),
            quantity,
            unit_price,
            total: None,
        }
    }

    fn consultation_items() -> Vec<LineItemInput> {
        vec![
            item("Consultation", 1, dec!(50)),
            item("Paracetamol 500mg", 10, dec!(0.5)),
            item("Dressing", 1, dec!(25)),
        ]
    }

    #[tokio::test]
    async fn should_total_mixed_items_with_ten_percent_tax() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;

        let invoice = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: consultation_items(),
                    tax_rate: Some(dec!(10)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(invoice.subtotal, dec!(80.00));
        assert_eq!(invoice.tax_amount, dec!(8.00));
        assert_eq!(invoice.grand_total, dec!(88.00));
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.line_items[1].total, dec!(5.00));
    }

    #[tokio::test]
    async fn should_assign_year_bucketed_invoice_numbers() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let year = Utc::now().year();

        for expected in 1..=2u32 {
            let invoice = ledger
                .create(
                    "billing",
                    InvoiceInput {
                        patient_id,
                        line_items: vec![item("Consultation", 1, dec!(50))],
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(
                invoice.invoice_number,
                format!("INV-{}-{:06}", year, expected)
            );
        }
    }

    #[tokio::test]
    async fn should_require_at_least_one_line_item() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;

        let err = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: vec![],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EmrError::Validation(_)));
    }

    #[tokio::test]
    async fn should_verify_caller_supplied_line_totals() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;

        let mut wrong = item("Consultation", 2, dec!(50));
        wrong.total = Some(dec!(90));
        let err = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: vec![wrong],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmrError::Validation(ValidationError::LineTotalMismatch(0, _, _))
        ));

        let mut right = item("Consultation", 2, dec!(50));
        right.total = Some(dec!(100.00));
        assert!(ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: vec![right],
                    ..Default::default()
                },
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn should_apply_percentage_discount_with_reason() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let invoice = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: consultation_items(),
                    tax_rate: Some(dec!(10)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let discounted = ledger
            .apply_discount("billing", invoice.id, None, Some(dec!(10)), "staff rate")
            .await
            .unwrap();
        assert_eq!(discounted.subtotal, dec!(80.00));
        assert_eq!(discounted.tax_amount, dec!(7.20));
        assert_eq!(discounted.grand_total, dec!(79.20));
        assert_eq!(discounted.discount_reason.as_deref(), Some("staff rate"));
    }

    #[tokio::test]
    async fn should_reject_discount_without_reason_or_with_both_kinds() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let invoice = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: consultation_items(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(ledger
            .apply_discount("billing", invoice.id, None, Some(dec!(10)), "  ")
            .await
            .is_err());
        assert!(matches!(
            ledger
                .apply_discount(
                    "billing",
                    invoice.id,
                    Some(dec!(5)),
                    Some(dec!(10)),
                    "promo"
                )
                .await
                .unwrap_err(),
            EmrError::Validation(ValidationError::ConflictingDiscounts)
        ));

        // Creating with a discount but no reason fails the same way.
        let err = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: consultation_items(),
                    discount_percent: Some(dec!(10)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmrError::Validation(ValidationError::MissingDiscountReason)
        ));
    }

    #[tokio::test]
    async fn should_reject_out_of_range_rates() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;

        let err = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: consultation_items(),
                    tax_rate: Some(dec!(101)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EmrError::Validation(_)));

        let err = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: consultation_items(),
                    discount_percent: Some(dec!(120)),
                    discount_reason: Some("promo".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EmrError::Validation(_)));
    }

    #[tokio::test]
    async fn should_walk_settlement_states_through_payments_and_refunds() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let invoice = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: consultation_items(),
                    tax_rate: Some(dec!(10)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after_first = ledger
            .record_payment(
                "billing",
                invoice.id,
                dec!(40),
                PaymentMethod::Cash,
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(after_first.status, InvoiceStatus::PartiallyPaid);

        let after_second = ledger
            .record_payment(
                "billing",
                invoice.id,
                dec!(48),
                PaymentMethod::Mobile,
                Some("RCPT-77".to_string()),
                None,
            )
            .await
            .unwrap();
        assert_eq!(after_second.status, InvoiceStatus::Paid);
        assert_eq!(after_second.payments_total(), dec!(88));

        let after_refund = ledger
            .record_refund(
                "billing",
                invoice.id,
                dec!(88),
                "service not rendered",
                None,
            )
            .await
            .unwrap();
        assert_eq!(after_refund.status, InvoiceStatus::Refunded);
    }

    #[tokio::test]
    async fn should_validate_payment_and_refund_amounts() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let invoice = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: consultation_items(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            ledger
                .record_payment(
                    "billing",
                    invoice.id,
                    dec!(0),
                    PaymentMethod::Cash,
                    None,
                    None
                )
                .await
                .unwrap_err(),
            EmrError::Validation(ValidationError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            ledger
                .record_refund("billing", invoice.id, dec!(-5), "reason", None)
                .await
                .unwrap_err(),
            EmrError::Validation(ValidationError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            ledger
                .record_refund("billing", invoice.id, dec!(10), "  ", None)
                .await
                .unwrap_err(),
            EmrError::Validation(ValidationError::MissingField(_))
        ));
        // Nothing collected yet, so nothing is refundable.
        assert!(matches!(
            ledger
                .record_refund("billing", invoice.id, dec!(10), "overcharge", None)
                .await
                .unwrap_err(),
            EmrError::BusinessRule(_)
        ));
    }

    #[tokio::test]
    async fn should_block_discount_amendment_after_settlement() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let invoice = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: vec![item("Consultation", 1, dec!(50))],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        ledger
            .record_payment(
                "billing",
                invoice.id,
                dec!(50),
                PaymentMethod::Card,
                None,
                None,
            )
            .await
            .unwrap();

        assert!(matches!(
            ledger
                .apply_discount("billing", invoice.id, None, Some(dec!(10)), "late request")
                .await
                .unwrap_err(),
            EmrError::BusinessRule(_)
        ));
    }

    #[tokio::test]
    async fn should_search_by_number_name_and_status() {
        let (ledger, registry, _) = fixture().await;
        let patient_id = registered_patient(&registry).await;
        let invoice = ledger
            .create(
                "billing",
                InvoiceInput {
                    patient_id,
                    line_items: vec![item("Consultation", 1, dec!(50))],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let by_number = ledger
            .search(InvoiceSearch {
                query: Some(invoice.invoice_number.to_lowercase()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_number.meta.total, 1);

        let by_name = ledger
            .search(InvoiceSearch {
                query: Some("mensah".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.meta.total, 1);

        let paid = ledger
            .search(InvoiceSearch {
                status: Some(InvoiceStatus::Paid),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paid.meta.total, 0);

        let by_patient = ledger
            .search(InvoiceSearch {
                patient_id: Some(patient_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_patient.meta.total, 1);
    }
}
