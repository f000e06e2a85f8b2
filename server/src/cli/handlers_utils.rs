// server/src/cli/handlers_utils.rs
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use models::errors::{EmrError, EmrResult, ValidationError};
use models::invoice::LineItemInput;
use models::pagination::PageRequest;

/// Pretty-printed JSON for terminal output; everything the CLI shows goes
/// through here.
pub fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

pub fn page_request(page: u32, limit: u32) -> PageRequest {
    PageRequest::new(page, limit)
}

pub fn parse_date(field: &str, value: &str) -> EmrResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(field.to_string(), value.to_string()).into())
}

pub fn parse_datetime(field: &str, value: &str) -> EmrResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidDate(field.to_string(), value.to_string()).into())
}

/// Parses one `--item` argument of the form `description:quantity:unit_price`.
/// Splits from the right so descriptions may contain colons.
pub fn parse_line_item(raw: &str) -> EmrResult<LineItemInput> {
    let mut parts = raw.rsplitn(3, ':');
    let price = parts.next();
    let quantity = parts.next();
    let description = parts.next();
    match (description, quantity, price) {
        (Some(description), Some(quantity), Some(price)) => {
            let quantity: u32 = quantity.parse().map_err(|_| {
                EmrError::from(ValidationError::invalid("item.quantity", quantity))
            })?;
            let unit_price: Decimal = price
                .parse()
                .map_err(|_| EmrError::from(ValidationError::invalid("item.unit_price", price)))?;
            Ok(LineItemInput {
                description: description.to_string(),
                quantity,
                unit_price,
                total: None,
            })
        }
        _ => Err(ValidationError::invalid("item", raw).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn should_parse_line_item_with_colon_in_description() {
        let item = parse_line_item("X-ray: left wrist:1:75.50").unwrap();
        assert_eq!(item.description, "X-ray: left wrist");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.unit_price, dec!(75.50));
    }

    #[test]
    fn should_reject_malformed_line_items() {
        assert!(parse_line_item("just-a-description").is_err());
        assert!(parse_line_item("desc:two:5.00").is_err());
        assert!(parse_line_item("desc:2:abc").is_err());
    }

    #[test]
    fn should_parse_dates_and_timestamps() {
        assert!(parse_date("dob", "1985-06-15").is_ok());
        assert!(parse_date("dob", "15/06/1985").is_err());
        assert!(parse_datetime("occurred_at", "2026-08-05T10:30:00Z").is_ok());
        assert!(parse_datetime("occurred_at", "yesterday").is_err());
    }
}
