//! Common validation and redaction helpers

use once_cell::sync::Lazy;
use regex::Regex;

static LOCATION_CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z][0-9A-Za-z_-]{0,31}$").expect("valid location code regex"));

/// Location codes are short alphanumeric identifiers
pub fn is_valid_location_code(code: &str) -> bool {
    LOCATION_CODE_REGEX.is_match(code)
}

/// Mask an email for logs: `jane@example.org` -> `j***@example.org`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        _ => String::from("***"),
    }
}

/// Mask a phone number for logs, keeping the last four digits
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return String::from("****");
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// Lower-case and trim an email for use as a lookup key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_code() {
        assert!(is_valid_location_code("35"));
        assert!(is_valid_location_code("35-07_12"));
        assert!(!is_valid_location_code(""));
        assert!(!is_valid_location_code("-12"));
        assert!(!is_valid_location_code("12 34"));
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("jane@example.org"), "j***@example.org");
        assert_eq!(mask_email("not-an-email"), "***");
        assert_eq!(mask_email("@example.org"), "***");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+62 812-3456-7890"), "****7890");
        assert_eq!(mask_phone("12"), "****");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@Example.ORG "), "jane@example.org");
    }
}
