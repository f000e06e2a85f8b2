// services/src/validate.rs
use models::errors::{ValidationError, ValidationResult};

pub(crate) const MAX_NAME_LEN: usize = 100;
pub(crate) const MAX_PHONE_LEN: usize = 32;
pub(crate) const MAX_EMAIL_LEN: usize = 254;

pub(crate) fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(())
}

pub(crate) fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong(field.to_string(), max));
    }
    Ok(())
}

/// Deliberately shallow: one '@' with something on both sides. Full RFC
/// address validation belongs to the mail system, not the registry.
pub(crate) fn check_email(email: &str) -> ValidationResult<()> {
    max_len("email", email, MAX_EMAIL_LEN)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::invalid("email", email)),
    }
}
