//! Local checks run before any request leaves the client.

use crate::types::{Credentials, NewTransaction, RegistrationForm};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_CATEGORY_LEN: usize = 100;
pub const MAX_TEXT_FIELD_LEN: usize = 255;

static EMAIL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").ok());

/// Machine-readable reason for a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MissingField,
    InvalidEmail,
    PasswordTooShort,
    PasswordMismatch,
    PasswordComplexity,
    InvalidAmount,
    TooLong,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidEmail => "invalid_email",
            ErrorCode::PasswordTooShort => "password_too_short",
            ErrorCode::PasswordMismatch => "password_mismatch",
            ErrorCode::PasswordComplexity => "password_complexity",
            ErrorCode::InvalidAmount => "invalid_amount",
            ErrorCode::TooLong => "too_long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub code: ErrorCode,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
        }
    }
}

/// `something@domain.tld`, with no whitespace in any part.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match EMAIL_PATTERN.as_ref() {
        Some(re) => re.is_match(email),
        None => false,
    }
}

fn has_password_complexity(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    if credentials.email.trim().is_empty() {
        return Err(ValidationError::new(
            "email",
            ErrorCode::MissingField,
            "Please enter your email",
        ));
    }
    if credentials.password.is_empty() {
        return Err(ValidationError::new(
            "password",
            ErrorCode::MissingField,
            "Please enter your password",
        ));
    }
    if !is_valid_email(&credentials.email) {
        return Err(ValidationError::new(
            "email",
            ErrorCode::InvalidEmail,
            "Please enter a valid email address",
        ));
    }
    Ok(())
}

/// Checks run in the order the registration form reports them; the first
/// failure wins.
pub fn validate_registration(form: &RegistrationForm) -> Result<(), ValidationError> {
    let missing = [
        ("full_name", form.full_name.trim().is_empty()),
        ("email", form.email.trim().is_empty()),
        ("password", form.password.is_empty()),
        ("confirm_password", form.confirm_password.is_empty()),
    ]
    .into_iter()
    .find(|(_, empty)| *empty);
    if let Some((field, _)) = missing {
        return Err(ValidationError::new(
            field,
            ErrorCode::MissingField,
            "Please fill in all fields",
        ));
    }

    if !is_valid_email(&form.email) {
        return Err(ValidationError::new(
            "email",
            ErrorCode::InvalidEmail,
            "Please enter a valid email address",
        ));
    }

    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            ErrorCode::PasswordTooShort,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        ));
    }

    if form.password != form.confirm_password {
        return Err(ValidationError::new(
            "confirm_password",
            ErrorCode::PasswordMismatch,
            "Passwords do not match",
        ));
    }

    if !has_password_complexity(&form.password) {
        return Err(ValidationError::new(
            "password",
            ErrorCode::PasswordComplexity,
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        ));
    }

    Ok(())
}

fn check_len(field: &'static str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::new(
            field,
            ErrorCode::TooLong,
            format!("{field} must be at most {max} characters"),
        )),
        _ => Ok(()),
    }
}

pub fn validate_new_transaction(tx: &NewTransaction) -> Result<(), ValidationError> {
    if !tx.amount.is_finite() || tx.amount == 0.0 {
        return Err(ValidationError::new(
            "amount",
            ErrorCode::InvalidAmount,
            "Amount cannot be zero",
        ));
    }
    if tx.category.trim().is_empty() {
        return Err(ValidationError::new(
            "category",
            ErrorCode::MissingField,
            "Please select a category",
        ));
    }
    check_len("category", Some(tx.category.trim()), MAX_CATEGORY_LEN)?;
    check_len("description", tx.description.as_deref().map(str::trim), MAX_TEXT_FIELD_LEN)?;
    check_len("location", tx.location.as_deref().map(str::trim), MAX_TEXT_FIELD_LEN)?;
    Ok(())
}
