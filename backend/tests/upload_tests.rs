//! Signed upload tests
//!
//! - Role and credential checks of the `sign-upload` function
//! - Signature agrees with an independent SHA-1 computation

mod common;

use axum::http::StatusCode;
use proptest::prelude::*;
use sha1::{Digest, Sha1};

use common::{bearer, post_json, send, test_app, test_config};
use lms_backend::config::{Config, MediaConfig};
use lms_backend::models::{validate_upload_folder, Role};

const SIGN: &str = "/functions/v1/sign-upload";
const SECRET: &str = "cdn-secret-value";

fn configured() -> Config {
    let mut config = test_config();
    config.media = MediaConfig {
        cloud_name: Some("lms-demo".to_string()),
        api_key: Some("874837483274837".to_string()),
        api_secret: Some(SECRET.to_string()),
    };
    config
}

/// sha1_hex("folder=<f>&timestamp=<t>" + secret), computed by hand
fn expected_signature(folder: &str, timestamp: i64) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("folder={}&timestamp={}{}", folder, timestamp, SECRET).as_bytes());
    hex::encode(hasher.finalize())
}

proptest! {
    /// Any folder built from the allowed alphabet validates
    #[test]
    fn test_allowed_folders(folder in "[A-Za-z0-9_/-]{1,100}") {
        prop_assert!(validate_upload_folder(&folder).is_ok());
    }

    /// Shared signer matches the hand-built string to sign
    #[test]
    fn test_signature_matches_manual_sha1(
        folder in "[a-z0-9_/-]{1,40}",
        timestamp in 1_600_000_000i64..2_000_000_000,
    ) {
        prop_assert_eq!(
            shared::signing::sign_folder_upload(&folder, timestamp, SECRET),
            expected_signature(&folder, timestamp)
        );
    }
}

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let (status, _) = send(test_app(configured()), post_json(SIGN, "{}", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            test_app(configured()),
            post_json(SIGN, "{}", Some("Bearer not-a-jwt")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_students_are_forbidden() {
        let auth = bearer(Role::Student);
        let (status, json) = send(test_app(configured()), post_json(SIGN, "{}", Some(&auth))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_unconfigured_credentials() {
        let auth = bearer(Role::Admin);
        let (status, _) = send(test_app(test_config()), post_json(SIGN, "{}", Some(&auth))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_folder() {
        let auth = bearer(Role::Teacher);
        for folder in ["../secrets", "has space", "semi;colon"] {
            let body = serde_json::json!({ "folder": folder }).to_string();
            let (status, json) = send(test_app(configured()), post_json(SIGN, &body, Some(&auth))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "folder {}", folder);
            assert_eq!(json["field"], "folder");
        }
    }

    #[tokio::test]
    async fn test_signed_response() {
        let auth = bearer(Role::Teacher);
        let body = r#"{"folder": "courses/thumbnails"}"#;
        let (status, json) = send(test_app(configured()), post_json(SIGN, body, Some(&auth))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cloudName"], "lms-demo");
        assert_eq!(json["apiKey"], "874837483274837");
        assert_eq!(json["folder"], "courses/thumbnails");

        let timestamp = json["timestamp"].as_i64().unwrap();
        assert_eq!(
            json["signature"].as_str().unwrap(),
            expected_signature("courses/thumbnails", timestamp)
        );
    }

    #[tokio::test]
    async fn test_default_folder() {
        let auth = bearer(Role::Admin);
        let (status, json) = send(test_app(configured()), post_json(SIGN, "", Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["folder"], "uploads");
    }
}
