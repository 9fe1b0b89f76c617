//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate that a required string field is present and within bounds
pub fn validate_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < min {
        if min <= 1 {
            return Err(format!("{field} is required"));
        }
        return Err(format!("{field} must be at least {min} characters long"));
    }
    if len > max {
        return Err(format!("{field} can not be more than {max} characters"));
    }
    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Please provide an email address".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Please provide a valid email address".to_string());
    }

    Ok(())
}

/// Validate a website address
pub fn validate_url(url: &str) -> Result<(), String> {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX.get_or_init(|| {
        Regex::new(r"^(https?://)?[a-zA-Z0-9][a-zA-Z0-9.-]*\.[a-zA-Z]{2,}(/\S*)?$")
            .expect("Failed to compile url regex")
    });

    if !regex.is_match(url) {
        return Err("Please provide a valid website address".to_string());
    }

    Ok(())
}

/// Validate a phone number
pub fn validate_phone(phone: &str) -> Result<(), String> {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX.get_or_init(|| {
        Regex::new(r"^[+]?[(]?[0-9]{3}[)]?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4,6}$")
            .expect("Failed to compile phone regex")
    });

    if !regex.is_match(phone) {
        return Err("Please provide a valid phone number".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Please provide a password".to_string());
    }

    if password.len() < 7 {
        return Err("Password length must be at least 7 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}
