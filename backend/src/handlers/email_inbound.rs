//! Inbound email webhook and the admin mailbox

use axum::{body::Bytes, extract::State, http::{HeaderMap, StatusCode}, Extension};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::handlers::parse_json_body;
use crate::middleware::AuthUser;
use crate::models::InboundEmail;
use crate::services::email_inbound::{
    EmailInboundService, EmailMessage, EmailThread, IngestResult, ReplyInput, ThreadDetail,
    ThreadFilter, ThreadStatusInput,
};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying base64(HMAC-SHA256(secret, raw body))
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

fn keyed_mac(secret: &str, body: &[u8]) -> Result<HmacSha256, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(body);
    Ok(mac)
}

/// Signature the mail provider is expected to send for `body`
pub fn webhook_signature(secret: &str, body: &[u8]) -> Result<String, String> {
    Ok(BASE64.encode(keyed_mac(secret, body)?.finalize().into_bytes()))
}

/// Check the webhook signature header against the raw body
pub fn verify_webhook_signature(headers: &HeaderMap, body: &[u8], secret: &str) -> Result<(), String> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or("Missing x-webhook-signature header")?;

    let provided = BASE64
        .decode(signature.trim())
        .map_err(|_| "Signature is not valid base64")?;

    keyed_mac(secret, body)?
        .verify_slice(&provided)
        .map_err(|_| "Signature mismatch".to_string())
}

/// POST /functions/v1/email-inbound-webhook
pub async fn inbound_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<IngestResult>> {
    if let Some(secret) = state.config.email.webhook_secret.as_deref().filter(|s| !s.is_empty()) {
        if let Err(e) = verify_webhook_signature(&headers, &body, secret) {
            tracing::warn!("Inbound email signature verification failed: {}", e);
            return Err(AppError::Unauthorized("Invalid signature".to_string()));
        }
    }

    let email: InboundEmail = parse_json_body(&body)?;
    let result = EmailInboundService::new(state.db).ingest(email).await?;

    let action = if result.new_thread {
        ChangeAction::Insert
    } else {
        ChangeAction::Update
    };
    state.changes.publish(Table::EmailThreads, action, result.thread_id);
    state
        .changes
        .publish(Table::EmailMessages, ChangeAction::Insert, result.message_id);

    Ok(Json(result))
}

pub async fn list_threads(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<ThreadFilter>,
) -> AppResult<Json<Vec<EmailThread>>> {
    user.require_admin()?;
    let threads = EmailInboundService::new(state.db)
        .list_threads(&filter)
        .await?;
    Ok(Json(threads))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(thread_id): Path<Uuid>,
) -> AppResult<Json<ThreadDetail>> {
    user.require_admin()?;
    let thread = EmailInboundService::new(state.db)
        .get_thread(thread_id)
        .await?;
    Ok(Json(thread))
}

/// Record an admin reply on a thread
pub async fn reply(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(thread_id): Path<Uuid>,
    Json(input): Json<ReplyInput>,
) -> AppResult<(StatusCode, Json<EmailMessage>)> {
    user.require_admin()?;
    let message = EmailInboundService::new(state.db)
        .reply(&user, thread_id, input)
        .await?;

    state
        .changes
        .publish(Table::EmailMessages, ChangeAction::Insert, message.id);
    state
        .changes
        .publish(Table::EmailThreads, ChangeAction::Update, thread_id);
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn set_thread_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(thread_id): Path<Uuid>,
    Json(input): Json<ThreadStatusInput>,
) -> AppResult<Json<EmailThread>> {
    user.require_admin()?;
    let thread = EmailInboundService::new(state.db)
        .set_status(thread_id, input.status)
        .await?;
    state
        .changes
        .publish(Table::EmailThreads, ChangeAction::Update, thread.id);
    Ok(Json(thread))
}
