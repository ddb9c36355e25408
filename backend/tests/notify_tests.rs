//! Enrollment notification tests
//!
//! The chat bot API is replaced by a local stub that records messages.

mod common;

use std::sync::{Arc, Mutex};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};

use common::{bearer, post_json, send, spawn_stub, test_app, test_config};
use lms_backend::config::{Config, TelegramConfig};
use lms_backend::models::{EnrollmentNotification, Role};

const NOTIFY: &str = "/functions/v1/student-enrollment-notify";

type Inbox = Arc<Mutex<Vec<Value>>>;

async fn send_message(State(inbox): State<Inbox>, Json(body): Json<Value>) -> Json<Value> {
    inbox.lock().unwrap().push(body);
    Json(json!({ "ok": true, "result": { "message_id": 1 } }))
}

async fn bot_config(reply_ok: bool) -> (Config, Inbox) {
    let inbox = Inbox::default();
    let router = if reply_ok {
        Router::new()
            .route("/botTEST-TOKEN/sendMessage", post(send_message))
            .with_state(inbox.clone())
    } else {
        Router::new().route(
            "/botTEST-TOKEN/sendMessage",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({ "ok": false }))) }),
        )
    };
    let base = spawn_stub(router).await;

    let mut config = test_config();
    config.telegram = TelegramConfig {
        bot_token: Some("TEST-TOKEN".to_string()),
        chat_id: Some("-100200300".to_string()),
        api_base: base,
    };
    (config, inbox)
}

fn notification_body() -> String {
    json!({
        "student_name": "Tanvir <Hasan>",
        "student_email": "tanvir@example.com",
        "student_phone": "01711111111",
        "course_name": "Graphic Design",
        "amount": 2500,
        "payment_method": "nagad",
        "transaction_id": "TX-77"
    })
    .to_string()
}

#[cfg(test)]
mod message_tests {
    use super::*;

    #[test]
    fn test_message_escapes_html() {
        let notification: EnrollmentNotification = serde_json::from_str(&notification_body()).unwrap();
        let message = notification.to_html_message();
        assert!(message.contains("Tanvir &lt;Hasan&gt;"));
        assert!(message.contains("Graphic Design"));
        assert!(!message.contains("<Hasan>"));
    }
}

#[cfg(test)]
mod contract_tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_authentication() {
        let (status, _) = send(test_app(test_config()), post_json(NOTIFY, &notification_body(), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_succeeds_without_bot() {
        let auth = bearer(Role::Student);
        let (status, json) =
            send(test_app(test_config()), post_json(NOTIFY, &notification_body(), Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "success": true }));
    }

    #[tokio::test]
    async fn test_delivers_to_configured_chat() {
        let (config, inbox) = bot_config(true).await;
        let auth = bearer(Role::Student);

        let (status, _) = send(test_app(config), post_json(NOTIFY, &notification_body(), Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);

        let messages = inbox.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["chat_id"], "-100200300");
        assert_eq!(messages[0]["parse_mode"], "HTML");
        assert!(messages[0]["text"].as_str().unwrap().contains("tanvir@example.com"));
    }

    #[tokio::test]
    async fn test_bot_failure_is_swallowed() {
        let (config, _) = bot_config(false).await;
        let auth = bearer(Role::Teacher);

        let (status, json) =
            send(test_app(config), post_json(NOTIFY, &notification_body(), Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn test_unreadable_payload_still_succeeds() {
        let (config, inbox) = bot_config(true).await;
        let auth = bearer(Role::Student);

        for body in ["{oops", r#"{"student_name": 42}"#] {
            let (status, json) = send(test_app(config.clone()), post_json(NOTIFY, body, Some(&auth))).await;
            assert_eq!(status, StatusCode::OK, "body {}", body);
            assert_eq!(json, json!({ "success": true }));
        }
        assert!(inbox.lock().unwrap().is_empty());
    }
}
