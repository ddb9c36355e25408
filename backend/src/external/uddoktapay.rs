//! UddoktaPay payment gateway client
//!
//! Hosted checkout (`checkout-v2`) and invoice verification (`verify-payment`).

use axum::http::StatusCode;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Header carrying the gateway API key
const API_KEY_HEADER: &str = "RT-UDDOKTAPAY-API-KEY";

/// Payment gateway client
#[derive(Clone)]
pub struct UddoktaPayClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Checkout request forwarded to the gateway
#[derive(Debug, Clone, Serialize)]
pub struct GatewayCheckoutRequest {
    pub full_name: String,
    pub email: String,
    pub amount: String,
    pub metadata: serde_json::Value,
    pub redirect_url: String,
    pub cancel_url: String,
    pub return_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Gateway answer to a checkout request
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayCheckoutResponse {
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub invoice_id: Option<String>,
}

/// Gateway answer to a verification request.
///
/// Amounts arrive as strings or numbers depending on the gateway version, so
/// they are kept as raw JSON and parsed on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayVerifyResponse {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub fee: serde_json::Value,
    #[serde(default)]
    pub charged_amount: serde_json::Value,
    #[serde(default)]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub sender_number: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Parse a gateway amount (`"100.00"` or `100`) into a decimal
pub fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Best-effort error message out of a gateway error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Payment gateway request failed".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

impl UddoktaPayClient {
    /// Create a new client against the given API base URL
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Start a hosted checkout
    pub async fn checkout(
        &self,
        request: &GatewayCheckoutRequest,
    ) -> AppResult<GatewayCheckoutResponse> {
        let body = self.post("checkout-v2", request).await?;

        let data: GatewayCheckoutResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::ExternalService(format!("Failed to parse checkout response: {}", e))
        })?;

        if data.status == Some(false) || data.payment_url.is_none() {
            return Err(AppError::Upstream {
                status: StatusCode::BAD_REQUEST,
                message: data
                    .message
                    .unwrap_or_else(|| "Payment gateway rejected the checkout".to_string()),
            });
        }

        Ok(data)
    }

    /// Verify an invoice
    pub async fn verify(&self, invoice_id: &str) -> AppResult<GatewayVerifyResponse> {
        let body = self
            .post("verify-payment", &serde_json::json!({ "invoice_id": invoice_id }))
            .await?;

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            AppError::ExternalService(format!("Failed to parse verify response: {}", e))
        })?;

        if raw.get("status").and_then(|s| s.as_bool()) == Some(false) {
            return Err(AppError::Upstream {
                status: StatusCode::BAD_REQUEST,
                message: error_message(&body),
            });
        }

        serde_json::from_value(raw).map_err(|e| {
            AppError::ExternalService(format!("Failed to parse verify response: {}", e))
        })
    }

    /// POST JSON to a gateway endpoint and return the raw success body
    async fn post<T: Serialize + ?Sized>(&self, endpoint: &str, payload: &T) -> AppResult<String> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Payment gateway request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!("Payment gateway {} returned {}: {}", endpoint, status, body);
            return Err(AppError::Upstream {
                status: StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
                message: error_message(&body),
            });
        }

        Ok(body)
    }
}
