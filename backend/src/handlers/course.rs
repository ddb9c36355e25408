//! Course catalogue handlers

use axum::{extract::State, http::StatusCode, Extension};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path};
use crate::middleware::AuthUser;
use crate::services::course::{
    Course, CourseListing, CourseService, CreateCourseInput, UpdateCourseInput,
};
use crate::services::realtime::{ChangeAction, Table};
use crate::AppState;

/// Published courses (public)
pub async fn list_published(State(state): State<AppState>) -> AppResult<Json<Vec<CourseListing>>> {
    let courses = CourseService::new(state.db).list_published().await?;
    Ok(Json(courses))
}

/// Published course by slug (public)
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<CourseListing>> {
    let course = CourseService::new(state.db)
        .get_published_by_slug(&slug)
        .await?;
    Ok(Json(course))
}

/// Courses the caller manages
pub async fn list_managed(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<CourseListing>>> {
    let courses = CourseService::new(state.db).list_managed(&user).await?;
    Ok(Json(courses))
}

pub async fn create_course(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateCourseInput>,
) -> AppResult<(StatusCode, Json<Course>)> {
    let course = CourseService::new(state.db).create(&user, input).await?;
    state
        .changes
        .publish(Table::Courses, ChangeAction::Insert, course.id);
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn update_course(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
    Json(input): Json<UpdateCourseInput>,
) -> AppResult<Json<Course>> {
    let course = CourseService::new(state.db)
        .update(&user, course_id, input)
        .await?;
    state
        .changes
        .publish(Table::Courses, ChangeAction::Update, course.id);
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    CourseService::new(state.db).delete(&user, course_id).await?;
    state
        .changes
        .publish(Table::Courses, ChangeAction::Delete, course_id);
    Ok(StatusCode::NO_CONTENT)
}
