//! Enrollment notification function

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::parse_json_body;
use crate::middleware::CurrentUser;
use crate::models::EnrollmentNotification;
use crate::services::notification::NotificationService;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub success: bool,
}

/// POST /functions/v1/student-enrollment-notify
///
/// Succeeds for any authenticated caller; unreadable payloads and delivery
/// problems are only logged.
pub async fn enrollment_notify(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> AppResult<Json<NotifyResponse>> {
    let delivered = match parse_json_body::<EnrollmentNotification>(&body) {
        Ok(notification) => {
            NotificationService::new(state.http.clone(), &state.config.telegram)
                .notify_enrollment(&notification)
                .await
        }
        Err(e) => {
            tracing::warn!(user_id = %user.user_id, "Skipping enrollment notification: {}", e);
            false
        }
    };
    tracing::debug!(user_id = %user.user_id, delivered, "Enrollment notification handled");

    Ok(Json(NotifyResponse { success: true }))
}
