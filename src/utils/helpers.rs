//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the
//! application.

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Normalize an email for use as the attendee directory key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize a phone number to E.164-ish format (+1XXXXXXXXXX).
///
/// Strips spaces, dashes, parens and dots. Adds a +1 prefix for 10-digit
/// US numbers. Returns None when no digits remain.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    if digits.len() == 10 {
        return Some(format!("+1{digits}"));
    }

    if digits.len() == 11 && digits.starts_with('1') {
        return Some(format!("+{digits}"));
    }

    Some(format!("+{digits}"))
}

/// Replace `{{variable}}` placeholders with values.
///
/// Unknown tokens are left verbatim rather than erroring, so a template
/// referencing a variable the caller did not supply still sends.
pub fn render_template_text(text: &str, variables: &HashMap<String, String>) -> String {
    // Compiled once on first use.
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN
        .get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("template token pattern is valid"));
    re.replace_all(text, |caps: &regex::Captures<'_>| {
        match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// Generate a scholarship code: a readable uppercase alphanumeric token.
pub fn generate_scholarship_code() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("SCH-{}", token.to_uppercase())
}
