//! Validation utilities for the Course Platform
//!
//! Used by the backend and, through the WASM bindings, by the browser so both
//! sides reject the same input.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

// ============================================================================
// Certificates
// ============================================================================

/// Shortest accepted certificate ID
pub const CERTIFICATE_ID_MIN_LEN: usize = 10;
/// Longest accepted certificate ID
pub const CERTIFICATE_ID_MAX_LEN: usize = 50;

static CERTIFICATE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9-]+$").expect("certificate id pattern"));

/// Trim and uppercase a certificate ID typed by a visitor
pub fn normalize_certificate_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Validate an already normalized certificate ID
pub fn validate_certificate_id(id: &str) -> Result<(), &'static str> {
    if id.len() < CERTIFICATE_ID_MIN_LEN || id.len() > CERTIFICATE_ID_MAX_LEN {
        return Err("Certificate ID must be between 10 and 50 characters");
    }
    if !CERTIFICATE_ID_RE.is_match(id) {
        return Err("Certificate ID may only contain A-Z, 0-9 and '-'");
    }
    Ok(())
}

// ============================================================================
// Accounts
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err("Invalid email format"),
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

// ============================================================================
// Inbound email
// ============================================================================

/// Sender parsed from an email `From` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub name: String,
    pub email: String,
}

static FROM_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:"?([^"<]*?)"?\s*)?<\s*([^<>\s]+@[^<>\s]+)\s*>\s*$"#)
        .expect("from header pattern")
});

/// Parse `Name <addr@host>`, `"Name" <addr@host>` or a bare `addr@host`.
///
/// The address is lowercased. A missing display name falls back to the
/// local part of the address.
pub fn parse_from_header(raw: &str) -> Option<EmailAddress> {
    let (name, email) = match FROM_HEADER_RE.captures(raw) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
            caps.get(2)?.as_str().to_string(),
        ),
        None => (String::new(), raw.trim().to_string()),
    };

    let email = email.to_lowercase();
    validate_email(&email).ok()?;

    let name = if name.is_empty() {
        email.split('@').next().unwrap_or_default().to_string()
    } else {
        name
    };

    Some(EmailAddress { name, email })
}

// ============================================================================
// Uploads
// ============================================================================

static UPLOAD_FOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_/-]{1,100}$").expect("upload folder pattern"));

/// Validate a media CDN folder name
pub fn validate_upload_folder(folder: &str) -> Result<(), &'static str> {
    if !UPLOAD_FOLDER_RE.is_match(folder) {
        return Err("Folder may only contain letters, digits, '_', '-' and '/'");
    }
    Ok(())
}

// ============================================================================
// Passcodes and courses
// ============================================================================

/// Characters used in generated passcodes (no 0/O or 1/I/L)
pub const PASSCODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
/// Characters per passcode group
pub const PASSCODE_GROUP_LEN: usize = 4;
/// Groups per passcode
pub const PASSCODE_GROUPS: usize = 3;

/// Normalize a passcode typed by a student
pub fn normalize_passcode(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Validate an already normalized passcode (`XXXX-XXXX-XXXX`)
pub fn validate_passcode(code: &str) -> Result<(), &'static str> {
    let groups: Vec<&str> = code.split('-').collect();
    if groups.len() != PASSCODE_GROUPS
        || groups.iter().any(|g| {
            g.len() != PASSCODE_GROUP_LEN || !g.bytes().all(|b| PASSCODE_ALPHABET.contains(&b))
        })
    {
        return Err("Passcode must look like XXXX-XXXX-XXXX");
    }
    Ok(())
}

/// Format raw alphabet indices into a passcode
pub fn format_passcode(indices: &[usize]) -> String {
    indices
        .chunks(PASSCODE_GROUP_LEN)
        .map(|chunk| {
            chunk
                .iter()
                .map(|i| PASSCODE_ALPHABET[i % PASSCODE_ALPHABET.len()] as char)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern"));

/// Validate a course URL slug
pub fn validate_slug(slug: &str) -> Result<(), &'static str> {
    if slug.len() > 120 || !SLUG_RE.is_match(slug) {
        return Err("Slug must be lowercase words separated by '-'");
    }
    Ok(())
}

/// Derive a slug from a course title
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug.truncate(120);
    slug.trim_end_matches('-').to_string()
}

// ============================================================================
// Money
// ============================================================================

/// Validate a positive money amount with at most two decimal places
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    if amount.normalize().scale() > 2 {
        return Err("Amount may have at most two decimal places");
    }
    Ok(())
}
