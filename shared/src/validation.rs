//! Input validation for the canteen
//!
//! Checks run before any storage is touched. Each failure names the offending
//! field and carries both an English and a Slovak message.

use thiserror::Error;

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
    pub message_sk: &'static str,
}

impl ValidationError {
    pub const fn new(field: &'static str, message: &'static str, message_sk: &'static str) -> Self {
        Self {
            field,
            message,
            message_sk,
        }
    }
}

/// Trim and lower-case an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err("Invalid email format");
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err("Invalid email format"),
    }
}

/// Domain part of an address, lower-cased
pub fn email_domain(email: &str) -> Option<String> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim().to_lowercase())
        .filter(|d| !d.is_empty())
}

/// An empty allow-list admits every domain
pub fn is_email_domain_allowed(email: &str, allowed_domains: &[String]) -> bool {
    if allowed_domains.is_empty() {
        return true;
    }
    match email_domain(email) {
        Some(domain) => allowed_domains.iter().any(|d| *d == domain),
        None => false,
    }
}

/// Split a comma separated setting into trimmed, lower-cased, non-empty items
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Largest quantity accepted in a single request or count
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Largest unit price accepted, 100 000.00 €
pub const MAX_PRICE_CENTS: i64 = 10_000_000;

pub fn validate_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::new(
            "quantity",
            "Quantity must be a positive integer",
            "Množstvo musí byť kladné celé číslo",
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(ValidationError::new(
            "quantity",
            "Quantity is too large",
            "Množstvo je príliš veľké",
        ));
    }
    Ok(())
}

/// Physically counted quantity; zero is a valid count
pub fn validate_counted_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity < 0 {
        return Err(ValidationError::new(
            "actual_quantity",
            "Counted quantity cannot be negative",
            "Spočítané množstvo nemôže byť záporné",
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(ValidationError::new(
            "actual_quantity",
            "Counted quantity is too large",
            "Spočítané množstvo je príliš veľké",
        ));
    }
    Ok(())
}

pub fn validate_price(field: &'static str, cents: i64) -> Result<(), ValidationError> {
    if cents <= 0 {
        return Err(ValidationError::new(
            field,
            "Price must be a positive amount in cents",
            "Cena musí byť kladná suma v centoch",
        ));
    }
    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::new(
            field,
            "Price is too large",
            "Cena je príliš vysoká",
        ));
    }
    Ok(())
}

pub fn validate_product_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new(
            "name",
            "Product name is required",
            "Názov produktu je povinný",
        ));
    }
    if name.trim().chars().count() > 200 {
        return Err(ValidationError::new(
            "name",
            "Product name is too long",
            "Názov produktu je príliš dlhý",
        ));
    }
    Ok(())
}

/// EAN barcodes: 8 to 14 digits
pub fn validate_ean(ean: &str) -> Result<(), ValidationError> {
    let ean = ean.trim();
    if ean.len() < 8 || ean.len() > 14 || !ean.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(
            "ean",
            "EAN must be 8 to 14 digits",
            "EAN musí mať 8 až 14 číslic",
        ));
    }
    Ok(())
}

/// One-time login codes are exactly six digits
pub fn validate_otp_code(code: &str) -> Result<(), &'static str> {
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err("Code must be 6 digits");
    }
    Ok(())
}
