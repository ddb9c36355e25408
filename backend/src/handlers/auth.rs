//! Authentication handlers

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::AppError;
use crate::extract::Json;
use crate::services::auth::{AuthService, AuthTokens, RegisterInput};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthTokens>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.login(&body.email, &body.password).await?;
    Ok(Json(tokens))
}

/// Student self-registration
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<(StatusCode, Json<AuthTokens>), AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.register(body).await?;

    state
        .changes
        .publish(Table::Profiles, ChangeAction::Insert, tokens.user_id);

    Ok((StatusCode::CREATED, Json(tokens)))
}

/// Refresh token endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AuthTokens>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.refresh_token(&body.refresh_token).await?;
    Ok(Json(tokens))
}

/// Revoke a refresh token
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    auth_service.logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}
