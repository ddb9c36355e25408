//! REST surface tests against the assembled router
//!
//! Authentication and role guards run before any database access, so these
//! hold without a live PostgreSQL.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use proptest::prelude::*;
use uuid::Uuid;

use common::{bearer, post_json, send, test_app, test_config};
use lms_backend::models::{Role, TicketStatus, WithdrawalStatus};
use lms_backend::services::finance::available_balance;
use rust_decimal::Decimal;

fn request(method: Method, uri: &str, auth: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

// ============================================================================
// Property Tests: state machines and balances
// ============================================================================

fn withdrawal_status_strategy() -> impl Strategy<Value = WithdrawalStatus> {
    prop_oneof![
        Just(WithdrawalStatus::Pending),
        Just(WithdrawalStatus::Approved),
        Just(WithdrawalStatus::Paid),
        Just(WithdrawalStatus::Rejected),
    ]
}

proptest! {
    /// Paid and rejected withdrawals are final
    #[test]
    fn test_terminal_withdrawals(next in withdrawal_status_strategy()) {
        prop_assert!(!WithdrawalStatus::Paid.can_transition_to(next));
        prop_assert!(!WithdrawalStatus::Rejected.can_transition_to(next));
    }

    /// Balance is net revenue less reserved and withdrawn amounts
    #[test]
    fn test_balance_accounting(
        net in 0i64..1_000_000,
        reserved in 0i64..1_000_000,
        withdrawn in 0i64..1_000_000,
    ) {
        let balance = available_balance(
            Decimal::new(net, 2),
            Decimal::new(reserved, 2),
            Decimal::new(withdrawn, 2),
        );
        prop_assert_eq!(balance, Decimal::new(net - reserved - withdrawn, 2));
    }
}

#[cfg(test)]
mod state_machine_tests {
    use super::*;

    #[test]
    fn test_ticket_lifecycle() {
        assert!(TicketStatus::Open.can_transition_to(TicketStatus::InProgress));
        assert!(TicketStatus::InProgress.can_transition_to(TicketStatus::Resolved));
        assert!(TicketStatus::Resolved.can_transition_to(TicketStatus::Open));
        assert!(!TicketStatus::Closed.can_transition_to(TicketStatus::Open));
    }

    #[test]
    fn test_withdrawal_lifecycle() {
        assert!(WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Approved));
        assert!(WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Rejected));
        assert!(WithdrawalStatus::Approved.can_transition_to(WithdrawalStatus::Paid));
        assert!(!WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Paid));
    }
}

// ============================================================================
// Router Tests
// ============================================================================

#[cfg(test)]
mod guard_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_database_state() {
        let (status, json) = send(
            test_app(test_config()),
            request(Method::GET, "/health", None, ""),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "disconnected");
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let routes = [
            (Method::GET, "/api/v1/profiles/me"),
            (Method::GET, "/api/v1/my/courses"),
            (Method::POST, "/api/v1/courses"),
            (Method::GET, "/api/v1/courses/manage"),
            (Method::POST, "/api/v1/passcodes/redeem"),
            (Method::GET, "/api/v1/revenue"),
            (Method::GET, "/api/v1/realtime"),
            (Method::POST, "/api/v1/content/team"),
        ];
        for (method, uri) in routes {
            let (status, json) = send(test_app(test_config()), request(method.clone(), uri, None, "{}")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            assert_eq!(json["code"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn test_expired_or_foreign_token_rejected() {
        let foreign = lms_backend::services::auth::encode_access_token(
            "some-other-secret",
            Uuid::new_v4(),
            "x@example.com",
            Role::Admin,
            600,
        )
        .unwrap();
        let auth = format!("Bearer {}", foreign);
        let (status, _) = send(
            test_app(test_config()),
            request(Method::GET, "/api/v1/profiles/me", Some(&auth), ""),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_only_routes_forbid_others() {
        let id = Uuid::new_v4();
        let passcode = format!(r#"{{"course_ids": ["{}"]}}"#, id);
        let routes = [
            (Method::GET, "/api/v1/profiles".to_string(), String::new()),
            (Method::POST, "/api/v1/passcodes".to_string(), passcode),
            (Method::GET, "/api/v1/certificates".to_string(), String::new()),
            (Method::GET, "/api/v1/email-threads".to_string(), String::new()),
            (
                Method::PUT,
                format!("/api/v1/withdrawals/{}/status", id),
                r#"{"status": "approved"}"#.to_string(),
            ),
            (
                Method::PUT,
                format!("/api/v1/tickets/{}", id),
                r#"{"status": "closed"}"#.to_string(),
            ),
            (
                Method::PUT,
                "/api/v1/content/pages/home/hero".to_string(),
                r#"{"content": {"title": "Learn"}}"#.to_string(),
            ),
        ];

        for role in [Role::Teacher, Role::Student] {
            let auth = bearer(role);
            for (method, uri, body) in &routes {
                let (status, _) = send(
                    test_app(test_config()),
                    request(method.clone(), uri, Some(&auth), body),
                )
                .await;
                assert_eq!(status, StatusCode::FORBIDDEN, "{:?} {} {}", role, method, uri);
            }
        }
    }

    #[tokio::test]
    async fn test_students_cannot_request_withdrawals() {
        let auth = bearer(Role::Student);
        let body = r#"{"amount": "100.00", "method": "bkash", "account_details": "01700000000"}"#;
        let (status, _) = send(
            test_app(test_config()),
            post_json("/api/v1/withdrawals", body, Some(&auth)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_function_preflight_allows_any_origin() {
        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/functions/v1/uddoktapay-checkout")
            .header(header::ORIGIN, "https://lms.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
            .body(Body::empty())
            .unwrap();

        let response = tower::ServiceExt::oneshot(test_app(test_config()), preflight)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_functions_reject_other_methods() {
        for name in ["uddoktapay-checkout", "uddoktapay-verify", "email-inbound-webhook"] {
            let uri = format!("/functions/v1/{}", name);
            let (status, _) = send(
                test_app(test_config()),
                request(Method::GET, &uri, None, ""),
            )
            .await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", name);
        }
    }

    #[tokio::test]
    async fn test_malformed_requests_use_error_body() {
        let student = bearer(Role::Student);
        let admin = bearer(Role::Admin);
        let cases = [
            request(Method::POST, "/api/v1/tickets", Some(&student), "{oops"),
            request(Method::POST, "/api/v1/tickets", Some(&student), r#"{"subject": 5, "message": "hi"}"#),
            request(Method::PUT, "/api/v1/tickets/not-a-uuid", Some(&admin), r#"{"status": "closed"}"#),
            request(Method::GET, "/api/v1/progress?course_id=nope", Some(&student), ""),
        ];

        for case in cases {
            let label = format!("{} {}", case.method(), case.uri());
            let response = tower::ServiceExt::oneshot(test_app(test_config()), case)
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", label);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json",
                "{}",
                label
            );

            let bytes = http_body_util::BodyExt::collect(response.into_body())
                .await
                .unwrap()
                .to_bytes();
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(json["code"], "BAD_REQUEST", "{}", label);
            assert!(json["error"].as_str().is_some_and(|e| !e.is_empty()), "{}", label);
        }
    }
}
