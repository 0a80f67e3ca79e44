//! Email, phone number and URL validation.

use std::str::FromStr;

use email_address::EmailAddress;
use phonenumber::country;
use serde_json::json;
use url::{Host, Url};

use crate::models::{PhoneSettings, ValidationResult};

// =============================================================================
// Email
// =============================================================================

/// Validate an email address and normalize its domain to lowercase.
///
/// Display-name forms (`Jane <jane@example.com>`) are rejected, and the
/// domain must contain at least one dot.
pub fn validate_email(raw: &str) -> ValidationResult {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return ValidationResult::invalid("Email cannot be empty");
    }
    if candidate.contains(char::is_whitespace) || candidate.contains('<') {
        return ValidationResult::invalid(format!("Invalid email format: {}", candidate));
    }

    let address = match EmailAddress::from_str(candidate) {
        Ok(address) => address,
        Err(e) => return ValidationResult::invalid(format!("Invalid email format: {}", e)),
    };

    let domain = address.domain().to_lowercase();
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return ValidationResult::invalid(format!(
            "Invalid email format: domain '{}' is not a valid hostname",
            domain
        ));
    }

    ValidationResult::valid_with(json!(format!("{}@{}", address.local_part(), domain)))
}

// =============================================================================
// Phone
// =============================================================================

/// Validate a phone number and format it internationally.
///
/// Numbers without a `+` prefix are read in the column's default region.
pub fn validate_phone(raw: &str, settings: &PhoneSettings) -> ValidationResult {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return ValidationResult::invalid("Phone number cannot be empty");
    }

    let region = match settings.country_code.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => match code.to_uppercase().parse::<country::Id>() {
            Ok(id) => Some(id),
            Err(_) => return ValidationResult::invalid("Invalid country code"),
        },
    };

    let number = match phonenumber::parse(region, candidate) {
        Ok(number) => number,
        Err(_) => {
            return ValidationResult::invalid(
                "Could not parse phone number. Please check format and country code.",
            );
        }
    };

    if !phonenumber::is_valid(&number) {
        return ValidationResult::invalid("Invalid phone number");
    }

    let formatted = number.format().mode(phonenumber::Mode::International).to_string();
    ValidationResult::valid_with(json!(formatted))
}

// =============================================================================
// URL
// =============================================================================

/// Validate a link target, prefixing `https://` when no scheme is given.
pub fn validate_url(raw: &str) -> ValidationResult {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return ValidationResult::invalid("URL cannot be empty");
    }

    let normalized = if candidate.contains("://") {
        candidate.to_string()
    } else {
        format!("https://{}", candidate)
    };

    let parsed = match Url::parse(&normalized) {
        Ok(url) => url,
        Err(e) => return ValidationResult::invalid(format!("Invalid URL: {}", e)),
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return ValidationResult::invalid(format!(
            "Invalid URL scheme: {} (expected http or https)",
            parsed.scheme()
        ));
    }

    let host_ok = match parsed.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.');
            (domain.contains('.') && !domain.starts_with('.')) || domain == "localhost"
        }
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        None => false,
    };
    if !host_ok {
        return ValidationResult::invalid(format!("Invalid URL: missing or malformed host in {}", candidate));
    }

    ValidationResult::valid_with(json!(normalized))
}
