//! HTTP request handlers

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

pub mod auth;
pub mod certificate;
pub mod content;
pub mod course;
pub mod email_inbound;
pub mod enrollment;
pub mod finance;
pub mod health;
pub mod notify;
pub mod passcode;
pub mod payment;
pub mod profile;
pub mod progress;
pub mod realtime;
pub mod support;
pub mod upload;
pub mod video;

/// Parse a function request body.
///
/// An empty body counts as `{}` so that missing fields are reported by the
/// handler's own validation rather than as a malformed request.
pub fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body[..]
    };

    serde_json::from_slice(raw).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        AppError::BadRequest("Invalid JSON body".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerifyCertificateRequest;

    #[test]
    fn test_empty_body_is_empty_object() {
        let req: VerifyCertificateRequest = parse_json_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(req.certificate_id.is_none());
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = parse_json_body::<VerifyCertificateRequest>(&Bytes::from_static(b"{oops"))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
