//! Passcode handlers

use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path};
use crate::middleware::{AuthUser, CurrentUser};
use crate::services::passcode::{
    CreatePasscodeInput, Passcode, PasscodeService, RedeemPasscodeInput, RedeemResult,
};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Generate a passcode (admin)
pub async fn create_passcode(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreatePasscodeInput>,
) -> AppResult<(StatusCode, Json<Passcode>)> {
    user.require_admin()?;
    let passcode = PasscodeService::new(state.db)
        .create(user.user_id, input)
        .await?;
    state
        .changes
        .publish(Table::Passcodes, ChangeAction::Insert, passcode.id);
    Ok((StatusCode::CREATED, Json(passcode)))
}

/// List passcodes (admin)
pub async fn list_passcodes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Passcode>>> {
    user.require_admin()?;
    let passcodes = PasscodeService::new(state.db).list().await?;
    Ok(Json(passcodes))
}

/// Activate or deactivate a passcode (admin)
pub async fn set_active(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(passcode_id): Path<Uuid>,
    Json(body): Json<SetActiveRequest>,
) -> AppResult<Json<Passcode>> {
    user.require_admin()?;
    let passcode = PasscodeService::new(state.db)
        .set_active(passcode_id, body.is_active)
        .await?;
    state
        .changes
        .publish(Table::Passcodes, ChangeAction::Update, passcode.id);
    Ok(Json(passcode))
}

/// Redeem a passcode for the calling student
pub async fn redeem(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<RedeemPasscodeInput>,
) -> AppResult<Json<RedeemResult>> {
    let result = PasscodeService::new(state.db)
        .redeem(user.user_id, &body.code)
        .await?;

    state
        .changes
        .publish(Table::Passcodes, ChangeAction::Update, result.passcode_id);
    for course_id in &result.newly_enrolled {
        state.changes.publish(
            Table::Enrollments,
            ChangeAction::Insert,
            format!("{}:{}", user.user_id, course_id),
        );
    }

    Ok(Json(result))
}
