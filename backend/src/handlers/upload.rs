//! Signed media uploads

use axum::{body::Bytes, extract::State, Json};

use crate::error::AppResult;
use crate::handlers::parse_json_body;
use crate::middleware::CurrentUser;
use crate::models::{SignUploadRequest, SignUploadResponse};
use crate::services::upload::sign_upload_now;
use crate::AppState;

/// POST /functions/v1/sign-upload (admin or teacher)
pub async fn sign_upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> AppResult<Json<SignUploadResponse>> {
    user.require_staff()?;
    let request: SignUploadRequest = parse_json_body(&body)?;

    let response = sign_upload_now(&state.config.media, &request)?;
    tracing::debug!(user_id = %user.user_id, folder = %response.folder, "Upload signed");
    Ok(Json(response))
}
