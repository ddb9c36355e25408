//! Public site content and its admin editor

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Extension};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path};
use crate::middleware::AuthUser;
use crate::services::content::{
    ContentService, Footer, FooterContent, FooterContentInput, FooterLink, FooterLinkInput,
    PageSection, PageSectionInput, TeamMember, TeamMemberInput, Work, WorkInput,
};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

// ============================================================================
// Public
// ============================================================================

pub async fn list_team(State(state): State<AppState>) -> AppResult<Json<Vec<TeamMember>>> {
    Ok(Json(ContentService::new(state.db).list_team().await?))
}

pub async fn list_works(State(state): State<AppState>) -> AppResult<Json<Vec<Work>>> {
    Ok(Json(ContentService::new(state.db).list_works().await?))
}

pub async fn get_footer(State(state): State<AppState>) -> AppResult<Json<Footer>> {
    Ok(Json(ContentService::new(state.db).footer().await?))
}

/// Sections of a page keyed by section name
pub async fn get_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> AppResult<Json<BTreeMap<String, serde_json::Value>>> {
    Ok(Json(ContentService::new(state.db).page(&page).await?))
}

// ============================================================================
// Team members (admin)
// ============================================================================

pub async fn create_team_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<TeamMemberInput>,
) -> AppResult<(StatusCode, Json<TeamMember>)> {
    user.require_admin()?;
    let member = ContentService::new(state.db)
        .create_team_member(input)
        .await?;
    state
        .changes
        .publish(Table::TeamMembers, ChangeAction::Insert, member.id);
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update_team_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<TeamMemberInput>,
) -> AppResult<Json<TeamMember>> {
    user.require_admin()?;
    let member = ContentService::new(state.db)
        .update_team_member(id, input)
        .await?;
    state
        .changes
        .publish(Table::TeamMembers, ChangeAction::Update, member.id);
    Ok(Json(member))
}

pub async fn delete_team_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    ContentService::new(state.db).delete_team_member(id).await?;
    state
        .changes
        .publish(Table::TeamMembers, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Works (admin)
// ============================================================================

pub async fn create_work(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<WorkInput>,
) -> AppResult<(StatusCode, Json<Work>)> {
    user.require_admin()?;
    let work = ContentService::new(state.db).create_work(input).await?;
    state
        .changes
        .publish(Table::Works, ChangeAction::Insert, work.id);
    Ok((StatusCode::CREATED, Json(work)))
}

pub async fn update_work(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<WorkInput>,
) -> AppResult<Json<Work>> {
    user.require_admin()?;
    let work = ContentService::new(state.db).update_work(id, input).await?;
    state
        .changes
        .publish(Table::Works, ChangeAction::Update, work.id);
    Ok(Json(work))
}

pub async fn delete_work(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    ContentService::new(state.db).delete_work(id).await?;
    state.changes.publish(Table::Works, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Footer (admin)
// ============================================================================

pub async fn create_footer_link(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<FooterLinkInput>,
) -> AppResult<(StatusCode, Json<FooterLink>)> {
    user.require_admin()?;
    let link = ContentService::new(state.db)
        .create_footer_link(input)
        .await?;
    state
        .changes
        .publish(Table::FooterLinks, ChangeAction::Insert, link.id);
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn update_footer_link(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<FooterLinkInput>,
) -> AppResult<Json<FooterLink>> {
    user.require_admin()?;
    let link = ContentService::new(state.db)
        .update_footer_link(id, input)
        .await?;
    state
        .changes
        .publish(Table::FooterLinks, ChangeAction::Update, link.id);
    Ok(Json(link))
}

pub async fn delete_footer_link(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    ContentService::new(state.db).delete_footer_link(id).await?;
    state
        .changes
        .publish(Table::FooterLinks, ChangeAction::Delete, id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /content/footer/:key
pub async fn set_footer_content(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(key): Path<String>,
    Json(input): Json<FooterContentInput>,
) -> AppResult<Json<FooterContent>> {
    user.require_admin()?;
    let content = ContentService::new(state.db)
        .set_footer_content(&key, &input.value)
        .await?;
    state
        .changes
        .publish(Table::FooterContent, ChangeAction::Update, &content.key);
    Ok(Json(content))
}

// ============================================================================
// Pages (admin)
// ============================================================================

/// PUT /content/pages/:page/:section
pub async fn set_page_section(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((page, section)): Path<(String, String)>,
    Json(input): Json<PageSectionInput>,
) -> AppResult<Json<PageSection>> {
    user.require_admin()?;
    let row = ContentService::new(state.db)
        .set_page_section(user.user_id, &page, &section, input.content)
        .await?;
    state
        .changes
        .publish(Table::PageContent, ChangeAction::Update, row.id);
    Ok(Json(row))
}
