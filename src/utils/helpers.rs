//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application:
//! input validation, CSV formatting and token generation.

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::utils::errors::{EventHubError, Result};

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn mobile_regex() -> &'static Regex {
    static MOBILE: OnceLock<Regex> = OnceLock::new();
    MOBILE.get_or_init(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("mobile pattern is valid"))
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

/// Validate mobile number format: 10 to 15 digits with an optional leading `+`.
/// Spaces and dashes are ignored.
pub fn is_valid_mobile(mobile: &str) -> bool {
    let compact: String = mobile
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    mobile_regex().is_match(&compact)
}

/// Check password strength: at least 8 characters with a letter and a digit
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < 8 {
        return Err(EventHubError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(EventHubError::InvalidInput(
            "Password must contain at least one letter and one number".to_string(),
        ));
    }
    Ok(())
}

/// Trim a required text field, rejecting blank values
pub fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EventHubError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trim a text field and check its length in characters
pub fn require_length(value: &str, field: &str, min: usize, max: usize) -> Result<String> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();
    if length < min {
        return Err(EventHubError::InvalidInput(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    if length > max {
        return Err(EventHubError::InvalidInput(format!(
            "{} must be less than {} characters",
            field, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalize an optional text field: blank becomes `None`
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Quote a single CSV cell, doubling embedded quotes
pub fn csv_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Build a CSV line from cells
pub fn csv_row<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cells
        .into_iter()
        .map(|cell| csv_cell(cell.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Replace every non-alphanumeric character with `_`
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Generate a random alphanumeric string
pub fn generate_random_string(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                            abcdefghijklmnopqrstuvwxyz\
                            0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hex-encoded SHA-256 digest, used to store one-time tokens
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
