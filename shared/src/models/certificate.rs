//! Certificate models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every issued certificate ID
pub const CERTIFICATE_PREFIX: &str = "CERT";

/// Body of the public certificate verification request.
///
/// The ID is kept as raw JSON so that a non-string value can be reported as a
/// validation failure instead of a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyCertificateRequest {
    #[serde(default)]
    pub certificate_id: Option<serde_json::Value>,
}

/// Public, non-identifying view of a certificate.
///
/// Deliberately carries no student fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateVerification {
    pub certificate_id: String,
    pub course_name: String,
    pub issued_at: DateTime<Utc>,
    pub is_valid: bool,
}

/// Build a certificate ID such as `CERT-20250314-7QK2M9XA`
pub fn format_certificate_id(issued_on: NaiveDate, suffix: &str) -> String {
    format!(
        "{}-{}-{}",
        CERTIFICATE_PREFIX,
        issued_on.format("%Y%m%d"),
        suffix.to_ascii_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_certificate_id;

    #[test]
    fn test_format_certificate_id() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let id = format_certificate_id(date, "7qk2m9xa");
        assert_eq!(id, "CERT-20250314-7QK2M9XA");
        assert!(validate_certificate_id(&id).is_ok());
    }

    #[test]
    fn test_verification_has_no_student_fields() {
        let v = CertificateVerification {
            certificate_id: "CERT-20250314-7QK2M9XA".to_string(),
            course_name: "Rust Basics".to_string(),
            issued_at: Utc::now(),
            is_valid: true,
        };
        let json = serde_json::to_value(&v).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert!(!obj.contains_key("student_name"));
        assert!(!obj.contains_key("user_id"));
    }
}
