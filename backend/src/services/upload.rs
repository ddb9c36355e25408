//! Signed direct uploads to the media CDN

use chrono::Utc;

use crate::config::MediaConfig;
use crate::error::{AppError, AppResult};
use crate::models::{validate_upload_folder, SignUploadRequest, SignUploadResponse, DEFAULT_UPLOAD_FOLDER};
use shared::signing::sign_folder_upload;

fn not_configured() -> AppError {
    AppError::Configuration("Media CDN credentials are not configured".to_string())
}

/// Resolve and validate the requested folder
pub fn resolve_folder(request: &SignUploadRequest) -> AppResult<String> {
    let folder = request
        .folder
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_UPLOAD_FOLDER);

    validate_upload_folder(folder).map_err(|msg| AppError::validation("folder", msg))?;
    Ok(folder.to_string())
}

/// Sign an upload into `folder` at `timestamp` (unix seconds)
pub fn sign_upload(media: &MediaConfig, folder: String, timestamp: i64) -> AppResult<SignUploadResponse> {
    let credentials = media.credentials().ok_or_else(not_configured)?;

    let signature = sign_folder_upload(&folder, timestamp, &credentials.api_secret);

    Ok(SignUploadResponse {
        cloud_name: credentials.cloud_name,
        api_key: credentials.api_key,
        timestamp,
        signature,
        folder,
    })
}

/// Sign an upload for the current time
pub fn sign_upload_now(media: &MediaConfig, request: &SignUploadRequest) -> AppResult<SignUploadResponse> {
    if media.credentials().is_none() {
        return Err(not_configured());
    }
    let folder = resolve_folder(request)?;
    sign_upload(media, folder, Utc::now().timestamp())
}
