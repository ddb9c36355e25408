//! Course video handlers

use axum::{extract::State, http::StatusCode, Extension};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path};
use crate::middleware::AuthUser;
use crate::services::realtime::{ChangeAction, Table};
use crate::services::video::{CourseVideos, CreateVideoInput, UpdateVideoInput, Video, VideoService};
use crate::AppState;

/// Videos of a course; previews only for callers without access
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<CourseVideos>> {
    let videos = VideoService::new(state.db)
        .list_for_course(&user, course_id)
        .await?;
    Ok(Json(videos))
}

pub async fn create_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
    Json(input): Json<CreateVideoInput>,
) -> AppResult<(StatusCode, Json<Video>)> {
    let video = VideoService::new(state.db)
        .create(&user, course_id, input)
        .await?;
    state
        .changes
        .publish(Table::Videos, ChangeAction::Insert, video.id);
    Ok((StatusCode::CREATED, Json(video)))
}

pub async fn update_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<Uuid>,
    Json(input): Json<UpdateVideoInput>,
) -> AppResult<Json<Video>> {
    let video = VideoService::new(state.db)
        .update(&user, video_id, input)
        .await?;
    state
        .changes
        .publish(Table::Videos, ChangeAction::Update, video.id);
    Ok(Json(video))
}

pub async fn delete_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    VideoService::new(state.db).delete(&user, video_id).await?;
    state
        .changes
        .publish(Table::Videos, ChangeAction::Delete, video_id);
    Ok(StatusCode::NO_CONTENT)
}
