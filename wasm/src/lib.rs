//! WebAssembly module for the Course Platform
//!
//! Provides client-side checks that mirror the server:
//! - Certificate ID normalization and validation
//! - Checkout form required fields
//! - Passcode, email and upload folder validation
//! - Course progress percentages

use rust_decimal::Decimal;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("course platform checks loaded"));
}

/// Normalize a certificate ID and return it, or throw the validation message
#[wasm_bindgen]
pub fn check_certificate_id(raw: &str) -> Result<String, JsValue> {
    let id = normalize_certificate_id(raw);
    validate_certificate_id(&id).map_err(|msg| JsValue::from(js_sys::Error::new(msg)))?;
    Ok(id)
}

/// Names of missing checkout fields, comma separated (empty when complete)
#[wasm_bindgen]
pub fn missing_checkout_fields(form_json: &str) -> Result<String, JsValue> {
    let form: CheckoutRequest = serde_json::from_str(form_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid checkout JSON: {}", e)))?;
    Ok(form.missing_fields().join(","))
}

/// Validate a price typed into the course editor
#[wasm_bindgen]
pub fn is_valid_price(amount: &str) -> bool {
    Decimal::from_str(amount.trim())
        .map(|d| validate_amount(d).is_ok())
        .unwrap_or(false)
}

/// Validate an email address
#[wasm_bindgen]
pub fn is_valid_email(email: &str) -> bool {
    validate_email(email).is_ok()
}

/// Validate a passcode typed by a student
#[wasm_bindgen]
pub fn is_valid_passcode(code: &str) -> bool {
    validate_passcode(&normalize_passcode(code)).is_ok()
}

/// Validate a media upload folder
#[wasm_bindgen]
pub fn is_valid_upload_folder(folder: &str) -> bool {
    validate_upload_folder(folder).is_ok()
}

/// Suggest a course slug for a title
#[wasm_bindgen]
pub fn suggest_slug(title: &str) -> String {
    slugify(title)
}

/// Course completion percentage
#[wasm_bindgen]
pub fn course_completion_percent(completed_videos: u32, total_videos: u32) -> i32 {
    completion_percent(i64::from(completed_videos), i64::from(total_videos))
}

/// Whether a role may open the back office
#[wasm_bindgen]
pub fn is_staff_role(role: &str) -> bool {
    role.parse::<Role>().map(|r| r.is_staff()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_checkout_fields() {
        let missing = missing_checkout_fields(r#"{"full_name":"A","amount":10}"#).unwrap();
        assert_eq!(missing, "email,redirect_url");
    }

    #[test]
    fn test_is_valid_price() {
        assert!(is_valid_price("1500"));
        assert!(is_valid_price("99.50"));
        assert!(!is_valid_price("0"));
        assert!(!is_valid_price("abc"));
    }

    #[test]
    fn test_is_staff_role() {
        assert!(is_staff_role("admin"));
        assert!(is_staff_role("Teacher"));
        assert!(!is_staff_role("student"));
        assert!(!is_staff_role(""));
    }

    #[test]
    fn test_course_completion() {
        assert_eq!(course_completion_percent(2, 4), 50);
        assert_eq!(course_completion_percent(0, 0), 0);
    }
}
