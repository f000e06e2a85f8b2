// models/src/invoice.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Refunded,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvoiceStatus::Unpaid => write!(f, "UNPAID"),
            InvoiceStatus::PartiallyPaid => write!(f, "PARTIALLY_PAID"),
            InvoiceStatus::Paid => write!(f, "PAID"),
            InvoiceStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNPAID" => Ok(InvoiceStatus::Unpaid),
            "PARTIALLY_PAID" => Ok(InvoiceStatus::PartiallyPaid),
            "PAID" => Ok(InvoiceStatus::Paid),
            "REFUNDED" => Ok(InvoiceStatus::Refunded),
            _ => Err(ValidationError::invalid("status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mobile,
    BankTransfer,
    Check,
    Insurance,
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "MOBILE" => Ok(PaymentMethod::Mobile),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "CHECK" => Ok(PaymentMethod::Check),
            "INSURANCE" => Ok(PaymentMethod::Insurance),
            _ => Err(ValidationError::invalid("method", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Optional caller-supplied total. The server recomputes the value and
    /// rejects the line when the two disagree.
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub receipt_no: Option<String>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub id: Uuid,
    pub amount: Decimal,
    pub reason: String,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub patient_id: Uuid,
    pub visit_id: Option<Uuid>,
    pub line_items: Vec<LineItem>,
    pub discount_amount: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub discount_reason: Option<String>,
    pub tax_rate: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub notes: Option<String>,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub refunds: Vec<Refund>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn payments_total(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn refunds_total(&self) -> Decimal {
        self.refunds.iter().map(|r| r.amount).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceInput {
    pub patient_id: Uuid,
    pub visit_id: Option<Uuid>,
    pub line_items: Vec<LineItemInput>,
    pub discount_amount: Option<Decimal>,
    pub discount_percent: Option<Decimal>,
    pub discount_reason: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
}

/// Human-readable invoice identifier, `INV-<year>-<6-digit sequence>`.
/// Same year-bucket scheme as patient codes.
pub fn invoice_number(year: i32, sequence: u32) -> String {
    format!("INV-{}-{:06}", year, sequence)
}

pub fn invoice_number_prefix(year: i32) -> String {
    format!("INV-{}-", year)
}

/// Derived money figures for one invoice, every field rounded to 2 dp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub discount_applied: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
}

pub fn line_total(quantity: u32, unit_price: Decimal) -> Decimal {
    (Decimal::from(quantity) * unit_price).round_dp(2)
}

/// Rejects a discount configuration the ledger will not accept: both kinds
/// at once, out-of-range percentage, negative amount, or a non-zero discount
/// without a reason.
pub fn validate_discount(
    amount: Option<Decimal>,
    percent: Option<Decimal>,
    reason: Option<&str>,
) -> ValidationResult<()> {
    if amount.is_some() && percent.is_some() {
        return Err(ValidationError::ConflictingDiscounts);
    }
    if let Some(a) = amount {
        if a < Decimal::ZERO {
            return Err(ValidationError::out_of_range(
                "discount_amount",
                format!("must not be negative, got {}", a),
            ));
        }
    }
    if let Some(p) = percent {
        if p < Decimal::ZERO || p > Decimal::ONE_HUNDRED {
            return Err(ValidationError::out_of_range(
                "discount_percent",
                format!("expected 0..=100, got {}", p),
            ));
        }
    }
    let has_discount = amount.map_or(false, |a| a > Decimal::ZERO)
        || percent.map_or(false, |p| p > Decimal::ZERO);
    if has_discount && reason.map_or(true, |r| r.trim().is_empty()) {
        return Err(ValidationError::MissingDiscountReason);
    }
    Ok(())
}

/// grand total = (sum of line totals - discount) x (1 + tax_rate/100).
/// A fixed discount is clamped to the subtotal so the discounted base never
/// goes negative.
pub fn compute_totals(
    line_totals: &[Decimal],
    discount_amount: Option<Decimal>,
    discount_percent: Option<Decimal>,
    tax_rate: Decimal,
) -> ValidationResult<InvoiceTotals> {
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE_HUNDRED {
        return Err(ValidationError::out_of_range(
            "tax_rate",
            format!("expected 0..=100, got {}", tax_rate),
        ));
    }

    let subtotal: Decimal = line_totals.iter().copied().sum::<Decimal>().round_dp(2);

    let discount_applied = if let Some(p) = discount_percent {
        (subtotal * p / Decimal::ONE_HUNDRED).round_dp(2)
    } else if let Some(a) = discount_amount {
        a.min(subtotal).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let discounted = subtotal - discount_applied;
    let tax_amount = (discounted * tax_rate / Decimal::ONE_HUNDRED).round_dp(2);
    let grand_total = (discounted + tax_amount).round_dp(2);

    Ok(InvoiceTotals {
        subtotal,
        discount_applied,
        tax_amount,
        grand_total,
    })
}

/// Settlement state from the cumulative payment/refund ledger.
pub fn derive_status(
    grand_total: Decimal,
    payments_total: Decimal,
    refunds_total: Decimal,
) -> InvoiceStatus {
    let net = payments_total - refunds_total;
    if refunds_total > Decimal::ZERO && net <= Decimal::ZERO {
        return InvoiceStatus::Refunded;
    }
    if net >= grand_total {
        return InvoiceStatus::Paid;
    }
    if net > Decimal::ZERO {
        return InvoiceStatus::PartiallyPaid;
    }
    InvoiceStatus::Unpaid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn should_total_mixed_line_items_with_ten_percent_tax() {
        let lines = vec![
            line_total(1, dec!(50)),
            line_total(10, dec!(0.5)),
            line_total(1, dec!(25)),
        ];
        let totals = compute_totals(&lines, None, None, dec!(10)).unwrap();
        assert_eq!(totals.subtotal, dec!(80.00));
        assert_eq!(totals.discount_applied, dec!(0));
        assert_eq!(totals.tax_amount, dec!(8.00));
        assert_eq!(totals.grand_total, dec!(88.00));
    }

    #[test]
    fn should_apply_percentage_discount_before_tax() {
        let lines = vec![
            line_total(1, dec!(50)),
            line_total(10, dec!(0.5)),
            line_total(1, dec!(25)),
        ];
        let totals = compute_totals(&lines, None, Some(dec!(10)), dec!(10)).unwrap();
        assert_eq!(totals.subtotal, dec!(80.00));
        assert_eq!(totals.discount_applied, dec!(8.00));
        assert_eq!(totals.tax_amount, dec!(7.20));
        assert_eq!(totals.grand_total, dec!(79.20));
    }

    #[test]
    fn should_clamp_fixed_discount_to_subtotal() {
        let lines = vec![line_total(1, dec!(30))];
        let totals = compute_totals(&lines, Some(dec!(100)), None, dec!(0)).unwrap();
        assert_eq!(totals.discount_applied, dec!(30));
        assert_eq!(totals.grand_total, dec!(0));
    }

    #[test]
    fn should_reject_both_discount_kinds_at_once() {
        let err = validate_discount(Some(dec!(5)), Some(dec!(10)), Some("promo")).unwrap_err();
        assert_eq!(err, ValidationError::ConflictingDiscounts);
    }

    #[test]
    fn should_require_reason_for_nonzero_discount() {
        let err = validate_discount(None, Some(dec!(10)), None).unwrap_err();
        assert_eq!(err, ValidationError::MissingDiscountReason);
        assert!(validate_discount(None, Some(dec!(10)), Some("staff rate")).is_ok());
        // A zero discount needs no reason.
        assert!(validate_discount(Some(dec!(0)), None, None).is_ok());
    }

    #[test]
    fn should_reject_out_of_range_percentages() {
        assert!(validate_discount(None, Some(dec!(101)), Some("x")).is_err());
        assert!(validate_discount(None, Some(dec!(-1)), Some("x")).is_err());
        assert!(compute_totals(&[dec!(10)], None, None, dec!(120)).is_err());
    }

    #[test]
    fn should_derive_status_from_ledger() {
        let grand = dec!(100);
        assert_eq!(derive_status(grand, dec!(0), dec!(0)), InvoiceStatus::Unpaid);
        assert_eq!(
            derive_status(grand, dec!(40), dec!(0)),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(derive_status(grand, dec!(100), dec!(0)), InvoiceStatus::Paid);
        assert_eq!(
            derive_status(grand, dec!(100), dec!(100)),
            InvoiceStatus::Refunded
        );
        assert_eq!(
            derive_status(grand, dec!(100), dec!(30)),
            InvoiceStatus::PartiallyPaid
        );
    }

    #[test]
    fn should_format_invoice_numbers() {
        assert_eq!(invoice_number(2026, 7), "INV-2026-000007");
        assert!(invoice_number(2026, 7).starts_with(&invoice_number_prefix(2026)));
    }
}
