//! Payment gateway payloads

use serde::{Deserialize, Serialize};

/// Fields the checkout request cannot do without
pub const REQUIRED_CHECKOUT_FIELDS: [&str; 4] = ["full_name", "email", "amount", "redirect_url"];

/// Browser request to start a hosted checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Number or numeric string
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

impl CheckoutRequest {
    /// Names of required fields that are absent or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        let amount_missing = match &self.amount {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };

        let mut missing = Vec::new();
        if blank(&self.full_name) {
            missing.push(REQUIRED_CHECKOUT_FIELDS[0]);
        }
        if blank(&self.email) {
            missing.push(REQUIRED_CHECKOUT_FIELDS[1]);
        }
        if amount_missing {
            missing.push(REQUIRED_CHECKOUT_FIELDS[2]);
        }
        if blank(&self.redirect_url) {
            missing.push(REQUIRED_CHECKOUT_FIELDS[3]);
        }
        missing
    }

    /// Amount rendered the way the gateway expects it (a plain string)
    pub fn amount_string(&self) -> Option<String> {
        match self.amount.as_ref()? {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

/// Successful checkout response returned to the browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub payment_url: String,
    pub invoice_id: String,
}

/// Browser request to verify a finished payment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub invoice_id: Option<String>,
}

/// Status reported by the gateway for an invoice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "payment_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Error,
}

impl PaymentStatus {
    /// Map the gateway's upper-case status string
    pub fn from_gateway(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => PaymentStatus::Completed,
            "PENDING" => PaymentStatus::Pending,
            _ => PaymentStatus::Error,
        }
    }
}

/// Pull the invoice ID out of a hosted payment URL (its last path segment)
pub fn invoice_id_from_payment_url(payment_url: &str) -> Option<String> {
    let path = payment_url.split(['?', '#']).next()?;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_all() {
        let req = CheckoutRequest::default();
        assert_eq!(req.missing_fields(), REQUIRED_CHECKOUT_FIELDS.to_vec());
    }

    #[test]
    fn test_missing_fields_none() {
        let req: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "full_name": "Rahim Uddin",
            "email": "rahim@example.com",
            "amount": 1500,
            "redirect_url": "https://example.com/success"
        }))
        .unwrap();
        assert!(req.missing_fields().is_empty());
        assert_eq!(req.amount_string().as_deref(), Some("1500"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let req: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "full_name": "  ",
            "email": "rahim@example.com",
            "amount": "",
            "redirect_url": "https://example.com/success"
        }))
        .unwrap();
        assert_eq!(req.missing_fields(), vec!["full_name", "amount"]);
    }

    #[test]
    fn test_gateway_status() {
        assert_eq!(PaymentStatus::from_gateway("COMPLETED"), PaymentStatus::Completed);
        assert_eq!(PaymentStatus::from_gateway("pending"), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_gateway("ERROR"), PaymentStatus::Error);
    }

    #[test]
    fn test_invoice_id_from_payment_url() {
        assert_eq!(
            invoice_id_from_payment_url("https://sandbox.uddoktapay.com/payment/abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            invoice_id_from_payment_url("https://pay.example.com/checkout/XYZ/?lang=bn").as_deref(),
            Some("XYZ")
        );
        assert_eq!(invoice_id_from_payment_url("https://"), None);
    }
}
