//! Video progress handlers

use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::services::progress::{
    CourseProgressSummary, ProgressQuery, ProgressService, UpdateProgressInput, VideoProgress,
};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

/// PUT /progress/:video_id
pub async fn upsert_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<Uuid>,
    Json(input): Json<UpdateProgressInput>,
) -> AppResult<Json<VideoProgress>> {
    let progress = ProgressService::new(state.db)
        .upsert(&user, video_id, input)
        .await?;
    state
        .changes
        .publish(Table::VideoProgress, ChangeAction::Update, progress.id);
    Ok(Json(progress))
}

/// GET /progress?course_id=
pub async fn list_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ProgressQuery>,
) -> AppResult<Json<Vec<VideoProgress>>> {
    let rows = ProgressService::new(state.db)
        .list(user.user_id, query.course_id)
        .await?;
    Ok(Json(rows))
}

pub async fn course_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<CourseProgressSummary>> {
    let summary = ProgressService::new(state.db)
        .course_summary(user.user_id, course_id)
        .await?;
    Ok(Json(summary))
}
