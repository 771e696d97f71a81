//! Field validators shared by the request contracts.
//!
//! Every validator answers with a [`ValidationResult`] instead of failing, so the
//! caller decides how to report the problem.

use std::borrow::Cow;

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors};

pub const EMPTY_FIELD_MESSAGE: &str = "El campo no puede estar vacío";
pub const INVALID_EMAIL_MESSAGE: &str = "Formato de email inválido.";
pub const VALID_EMAIL_MESSAGE: &str = "Email válido.";
pub const INVALID_YEAR_MESSAGE: &str = "Formato de 'release_year' inválido.";
pub const VALID_YEAR_MESSAGE: &str = "Año válido.";
pub const UNDERAGE_MESSAGE: &str = "La edad mínima es 13 años.";
pub const OVERAGE_MESSAGE: &str = "La edad máxima es 150 años.";

/// Email providers whose accounts are rejected at signup.
pub const BLOCKED_DOMAINS: [&str; 3] = ["yahoo.com", "netscape.net", "river.org"];

pub const MIN_USER_AGE: i64 = 13;
pub const MAX_USER_AGE: i64 = 150;
pub const MIN_RELEASE_YEAR: i64 = 1;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap()
});

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Checks that a required text field is present and not blank.
pub fn validate(value: Option<&str>) -> ValidationResult {
    match value {
        Some(text) if !text.trim().is_empty() => ValidationResult::ok("ok"),
        _ => ValidationResult::invalid(EMPTY_FIELD_MESSAGE),
    }
}

/// Coerces a JSON value into a year: integers as-is, strings when they parse.
pub fn parse_year(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Accepts years between 1 and next year inclusive.
pub fn validate_year(value: Option<&Value>) -> ValidationResult {
    let max_year = i64::from(Utc::now().year()) + 1;
    match value.and_then(parse_year) {
        Some(year) if (MIN_RELEASE_YEAR..=max_year).contains(&year) => {
            ValidationResult::ok(VALID_YEAR_MESSAGE)
        }
        _ => ValidationResult::invalid(INVALID_YEAR_MESSAGE),
    }
}

pub fn validate_email(value: Option<&str>) -> ValidationResult {
    let Some(email) = value else {
        return ValidationResult::invalid(INVALID_EMAIL_MESSAGE);
    };

    if !EMAIL_REGEX.is_match(email) {
        return ValidationResult::invalid(INVALID_EMAIL_MESSAGE);
    }

    // The regex guarantees exactly one '@'.
    let domain = email.rsplit('@').next().unwrap_or_default().to_ascii_lowercase();
    if let Some(blocked) = BLOCKED_DOMAINS.iter().find(|blocked| **blocked == domain) {
        return ValidationResult::invalid(format!("No se permiten cuentas de {blocked}."));
    }

    ValidationResult::ok(VALID_EMAIL_MESSAGE)
}

pub fn validate_age(age: i64) -> ValidationResult {
    if age < MIN_USER_AGE {
        ValidationResult::invalid(UNDERAGE_MESSAGE)
    } else if age > MAX_USER_AGE {
        ValidationResult::invalid(OVERAGE_MESSAGE)
    } else {
        ValidationResult::ok("ok")
    }
}

/// Records a failed [`ValidationResult`] under `field` in the collected errors.
pub fn collect(errors: &mut ValidationErrors, field: &'static str, result: ValidationResult) {
    if result.valid {
        return;
    }
    let mut error = ValidationError::new("invalid");
    error.message = Some(Cow::Owned(result.message));
    errors.add(field, error);
}
