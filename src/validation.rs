//! Field-level checks shared by the request DTOs.
//!
//! Every helper records problems into a [`FieldErrors`] instead of returning
//! early, so a single response can report all invalid fields at once.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_NUMBER: &str = "A valid number is required.";
pub const NOT_AN_INTEGER: &str = "A valid integer is required.";
pub const NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";

const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_MAX_DIGITS: u32 = 10;

pub fn required_text(errors: &mut FieldErrors, field: &str, value: Option<String>, max_len: Option<usize>) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if let Some(max) = max_len {
        if trimmed.chars().count() > max {
            errors.add(field, format!("Ensure this field has no more than {max} characters."));
            return None;
        }
    }
    Some(trimmed.to_string())
}

pub fn optional_text(errors: &mut FieldErrors, field: &str, value: Option<String>, max_len: usize) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.chars().count() > max_len {
        errors.add(field, format!("Ensure this field has no more than {max_len} characters."));
    }
    value
}

/// A fixed-point price with at most 8 integer digits and 2 decimal places.
///
/// Accepts JSON strings (`"9.99"`) and numbers (`9.99`). Decimal places are
/// counted as written, so `"1.500"` is rejected. The result is rescaled to
/// exactly two decimal places.
pub fn price(errors: &mut FieldErrors, field: &str, value: Option<Value>, allow_negative: bool) -> Option<Decimal> {
    let parsed = match value {
        None | Some(Value::Null) => {
            errors.add(field, REQUIRED);
            return None;
        }
        Some(Value::String(s)) => parse_decimal(s.trim()),
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(_) => None,
    };
    let Some(amount) = parsed else {
        errors.add(field, NOT_A_NUMBER);
        return None;
    };

    // trailing zeros count towards the decimal places, as written
    if amount.scale() > PRICE_DECIMAL_PLACES {
        errors.add(field, format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."));
        return None;
    }
    let max_whole_digits = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;
    if amount.abs().trunc() >= Decimal::from(10_i64.pow(max_whole_digits)) {
        errors.add(field, format!("Ensure that there are no more than {max_whole_digits} digits before the decimal point."));
        return None;
    }
    if !allow_negative && amount.is_sign_negative() && !amount.is_zero() {
        errors.add(field, NEGATIVE);
        return None;
    }

    let mut amount = amount.normalize();
    amount.rescale(PRICE_DECIMAL_PLACES);
    Some(amount)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// A non-negative integer that fits a PostgreSQL `INTEGER` column.
pub fn non_negative_int(errors: &mut FieldErrors, field: &str, value: Option<Value>) -> Option<i32> {
    let parsed = match value {
        None | Some(Value::Null) => {
            errors.add(field, REQUIRED);
            return None;
        }
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    let Some(n) = parsed else {
        errors.add(field, NOT_AN_INTEGER);
        return None;
    };
    if n < 0 {
        errors.add(field, NEGATIVE);
        return None;
    }
    match i32::try_from(n) {
        Ok(v) => Some(v),
        Err(_) => {
            errors.add(field, format!("Ensure this value is less than or equal to {}.", i32::MAX));
            None
        }
    }
}

/// An absolute http(s) URL, or nothing when absent/blank.
pub fn optional_url(errors: &mut FieldErrors, field: &str, value: Option<String>, max_len: usize) -> Option<String> {
    let value = value?.trim().to_string();
    if value.is_empty() {
        return None;
    }
    if value.chars().count() > max_len {
        errors.add(field, format!("Ensure this field has no more than {max_len} characters."));
        return None;
    }
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => Some(value),
        _ => {
            errors.add(field, "Enter a valid URL.");
            None
        }
    }
}

/// Letters, digits and `@ . + - _` only.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}
