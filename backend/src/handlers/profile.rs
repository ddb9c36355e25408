//! Profile handlers

use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{PaginatedResponse, Pagination, Role};
use crate::services::profile::{Profile, ProfileFilter, ProfileService, UpdateProfileInput};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListProfilesQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub role: Option<Role>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// The caller's own profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Profile>> {
    let profile = ProfileService::new(state.db).get(user.user_id).await?;
    Ok(Json(profile))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<Json<Profile>> {
    let profile = ProfileService::new(state.db)
        .update_me(user.user_id, input)
        .await?;
    state
        .changes
        .publish(Table::Profiles, ChangeAction::Update, profile.id);
    Ok(Json(profile))
}

/// List profiles (admin)
pub async fn list_profiles(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListProfilesQuery>,
) -> AppResult<Json<PaginatedResponse<Profile>>> {
    user.require_admin()?;
    let filter = ProfileFilter {
        role: query.role,
        search: query.search,
    };
    let defaults = Pagination::default();
    let pagination = Pagination {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let page = ProfileService::new(state.db)
        .list(&filter, &pagination)
        .await?;
    Ok(Json(page))
}

/// Change a user's role (admin)
pub async fn set_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> AppResult<Json<Profile>> {
    user.require_admin()?;
    let profile = ProfileService::new(state.db)
        .set_role(user.user_id, profile_id, body.role)
        .await?;
    state
        .changes
        .publish(Table::Profiles, ChangeAction::Update, profile.id);
    Ok(Json(profile))
}

/// Enable or disable a user (admin)
pub async fn set_active(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<SetActiveRequest>,
) -> AppResult<Json<Profile>> {
    user.require_admin()?;
    let profile = ProfileService::new(state.db)
        .set_active(user.user_id, profile_id, body.is_active)
        .await?;
    state
        .changes
        .publish(Table::Profiles, ChangeAction::Update, profile.id);
    Ok(Json(profile))
}
