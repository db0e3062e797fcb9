//! Phone number helpers
//!
//! Numbers arrive in many shapes (SIP URIs, `tel:` URIs, national formats with
//! spaces and dashes). Everything downstream uses a leading-`+` canonical form.

/// Digits of a phone number, everything else dropped
pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Canonical `+<digits>` form, or `None` when the input holds no digits
///
/// URI schemes (`sip:`, `tel:`) and any `@host` suffix are stripped first.
pub fn normalize_phone_number(raw: &str) -> Option<String> {
    let mut value = raw.trim();
    for scheme in ["sip:", "tel:", "SIP:", "TEL:"] {
        if let Some(rest) = value.strip_prefix(scheme) {
            value = rest;
        }
    }
    if let Some((user, _host)) = value.split_once('@') {
        value = user;
    }

    let digits = phone_digits(value);
    if digits.is_empty() {
        None
    } else {
        Some(format!("+{digits}"))
    }
}

/// Validate a number for dialling and return its canonical form
pub fn validate_phone_number(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("phone number cannot be empty".to_string());
    }
    if trimmed.chars().any(|c| c.is_ascii_alphabetic())
        && !trimmed.starts_with("sip:")
        && !trimmed.starts_with("tel:")
    {
        return Err(format!("'{trimmed}' contains letters"));
    }

    let normalized =
        normalize_phone_number(trimmed).ok_or_else(|| format!("'{trimmed}' has no digits"))?;
    let digit_count = normalized.len() - 1;
    if !(3..=15).contains(&digit_count) {
        return Err(format!(
            "'{trimmed}' must have between 3 and 15 digits, found {digit_count}"
        ));
    }
    Ok(normalized)
}
