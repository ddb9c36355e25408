//! Inbound email webhook tests
//!
//! - Sender parsing of `From` headers
//! - Shared-secret signature check
//! - Threading by sender (database tests are ignored by default)

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use proptest::prelude::*;

use common::{post_json, send, test_app, test_config};
use lms_backend::config::Config;
use lms_backend::handlers::email_inbound::{webhook_signature, SIGNATURE_HEADER};
use lms_backend::models::{parse_from_header, InboundEmail};

const WEBHOOK: &str = "/functions/v1/email-inbound-webhook";
const SECRET: &str = "mailbox-secret";

fn signed_config() -> Config {
    let mut config = test_config();
    config.email.webhook_secret = Some(SECRET.to_string());
    config
}

fn signed_request(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(WEBHOOK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ============================================================================
// Property Tests: From header parsing
// ============================================================================

proptest! {
    /// `Name <addr>` yields the name and the lower-cased address
    #[test]
    fn test_named_address(
        name in "[A-Z][a-z]{2,10} [A-Z][a-z]{2,10}",
        local in "[A-Za-z0-9.]{1,12}",
        domain in "[a-z]{3,10}\\.(com|org|net)",
    ) {
        prop_assume!(!local.starts_with('.') && !local.ends_with('.') && !local.contains(".."));
        let raw = format!("\"{}\" <{}@{}>", name, local, domain);
        let parsed = parse_from_header(&raw).unwrap();
        prop_assert_eq!(parsed.name, name);
        prop_assert_eq!(parsed.email, format!("{}@{}", local, domain).to_lowercase());
    }

    /// A bare address uses its local part as the name
    #[test]
    fn test_bare_address(local in "[a-z0-9]{1,12}", domain in "[a-z]{3,10}\\.com") {
        let parsed = parse_from_header(&format!("{}@{}", local, domain)).unwrap();
        prop_assert_eq!(parsed.name, local);
    }
}

#[cfg(test)]
mod payload_tests {
    use super::*;

    #[test]
    fn test_provider_field_names() {
        let email: InboundEmail = serde_json::from_str(
            r#"{"From": "a@example.com", "Subject": "Hi", "TextBody": "Hello", "HtmlBody": "<p>Hello</p>", "MessageID": "<m1@example.com>"}"#,
        )
        .unwrap();
        assert_eq!(email.from.as_deref(), Some("a@example.com"));
        assert_eq!(email.text.as_deref(), Some("Hello"));
        assert_eq!(email.html.as_deref(), Some("<p>Hello</p>"));
        assert_eq!(email.message_id.as_deref(), Some("<m1@example.com>"));
    }

    #[test]
    fn test_payload_with_both_spellings() {
        let email: InboundEmail =
            serde_json::from_str(r#"{"from": "a@example.com", "From": "a@example.com", "Subject": "Hi"}"#)
                .unwrap();
        assert_eq!(email.from.as_deref(), Some("a@example.com"));
        assert_eq!(email.subject.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_empty_subject_placeholder() {
        let email = InboundEmail {
            subject: Some("   ".to_string()),
            ..InboundEmail::default()
        };
        assert_eq!(email.subject_or_default(), "(no subject)");
    }
}

// ============================================================================
// Contract Tests
// ============================================================================

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_sender_is_bad_request() {
        let (status, json) = send(
            test_app(test_config()),
            post_json(WEBHOOK, r#"{"subject": "No sender"}"#, None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "from");
    }

    #[tokio::test]
    async fn test_missing_signature_is_unauthorized() {
        let body = r#"{"from": "a@example.com"}"#;
        let (status, _) = send(test_app(signed_config()), post_json(WEBHOOK, body, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_signature_is_unauthorized() {
        let body = r#"{"from": "a@example.com"}"#;
        let forged = webhook_signature("another-secret", body.as_bytes()).unwrap();
        let (status, _) = send(test_app(signed_config()), signed_request(body, &forged)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signature_checked_before_parsing() {
        let (status, _) = send(test_app(signed_config()), signed_request("{broken", "AAAA")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_signature_reaches_validation() {
        let body = r#"{"subject": "Signed but no sender"}"#;
        let signature = webhook_signature(SECRET, body.as_bytes()).unwrap();
        let (status, _) = send(test_app(signed_config()), signed_request(body, &signature)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

// ============================================================================
// Database Tests: threading
// ============================================================================

#[cfg(test)]
mod threading_tests {
    use super::*;
    use lms_backend::services::email_inbound::EmailInboundService;
    use sqlx::PgPool;

    async fn service() -> EmailInboundService {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        EmailInboundService::new(pool)
    }

    fn email(from: &str, subject: &str) -> InboundEmail {
        InboundEmail {
            from: Some(from.to_string()),
            subject: Some(subject.to_string()),
            text: Some("Hello".to_string()),
            ..InboundEmail::default()
        }
    }

    #[tokio::test]
    #[ignore] // Requires database connection
    async fn test_same_sender_shares_open_thread() {
        let service = service().await;
        let sender = format!("student-{}@example.com", uuid::Uuid::new_v4().simple());

        let first = service
            .ingest(email(&format!("Student <{}>", sender), "Cannot open video"))
            .await
            .unwrap();
        let second = service.ingest(email(&sender, "Re: Cannot open video")).await.unwrap();

        assert!(first.new_thread);
        assert!(!second.new_thread);
        assert_eq!(first.thread_id, second.thread_id);

        let detail = service.get_thread(first.thread_id).await.unwrap();
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.thread.subject, "Cannot open video");
    }

    #[tokio::test]
    #[ignore] // Requires database connection
    async fn test_new_sender_gets_new_thread() {
        let service = service().await;
        let a = service
            .ingest(email(&format!("{}@example.com", uuid::Uuid::new_v4().simple()), "A"))
            .await
            .unwrap();
        let b = service
            .ingest(email(&format!("{}@example.com", uuid::Uuid::new_v4().simple()), "B"))
            .await
            .unwrap();

        assert!(a.new_thread && b.new_thread);
        assert_ne!(a.thread_id, b.thread_id);
    }

    #[tokio::test]
    #[ignore] // Requires database connection
    async fn test_closed_thread_starts_fresh() {
        let service = service().await;
        let sender = format!("{}@example.com", uuid::Uuid::new_v4().simple());

        let first = service.ingest(email(&sender, "Refund")).await.unwrap();
        service
            .set_status(first.thread_id, lms_backend::models::ThreadStatus::Closed)
            .await
            .unwrap();
        let second = service.ingest(email(&sender, "Refund again")).await.unwrap();

        assert!(second.new_thread);
        assert_ne!(first.thread_id, second.thread_id);
    }
}
