//! Course video service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::course::CourseService;
use crate::services::enrollment::EnrollmentService;

/// Video service
#[derive(Clone)]
pub struct VideoService {
    db: PgPool,
}

/// Video record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub duration_seconds: i32,
    pub position: i32,
    pub is_preview: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Videos of a course as seen by one caller
#[derive(Debug, Serialize)]
pub struct CourseVideos {
    pub course_id: Uuid,
    /// False when only preview videos are included
    pub has_full_access: bool,
    pub videos: Vec<Video>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVideoInput {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(url(message = "Video URL must be a URL"))]
    pub video_url: String,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    #[serde(default)]
    pub duration_seconds: i32,
    /// Appended after the last video when omitted
    pub position: Option<i32>,
    #[serde(default)]
    pub is_preview: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVideoInput {
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(url(message = "Video URL must be a URL"))]
    pub video_url: Option<String>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_seconds: Option<i32>,
    pub position: Option<i32>,
    pub is_preview: Option<bool>,
}

const VIDEO_COLUMNS: &str = "id, course_id, title, description, video_url, duration_seconds, \
                             position, is_preview, created_at, updated_at";

impl VideoService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Videos of a course; callers without access only see previews
    pub async fn list_for_course(&self, viewer: &AuthUser, course_id: Uuid) -> AppResult<CourseVideos> {
        let course = CourseService::new(self.db.clone()).get(course_id).await?;

        let has_full_access = viewer.is_admin()
            || (viewer.is_staff() && course.teacher_id == Some(viewer.user_id))
            || EnrollmentService::new(self.db.clone())
                .is_enrolled(viewer.user_id, course_id)
                .await?;

        if !has_full_access && !course.is_published {
            return Err(AppError::NotFound("Course".to_string()));
        }

        let videos = sqlx::query_as::<_, Video>(&format!(
            r#"
            SELECT {} FROM videos
            WHERE course_id = $1 AND ($2 OR is_preview)
            ORDER BY position, created_at
            "#,
            VIDEO_COLUMNS
        ))
        .bind(course_id)
        .bind(has_full_access)
        .fetch_all(&self.db)
        .await?;

        Ok(CourseVideos {
            course_id,
            has_full_access,
            videos,
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Video> {
        sqlx::query_as::<_, Video>(&format!("SELECT {} FROM videos WHERE id = $1", VIDEO_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Video".to_string()))
    }

    /// Add a video to a course the caller manages
    pub async fn create(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        input: CreateVideoInput,
    ) -> AppResult<Video> {
        input.validate()?;
        CourseService::new(self.db.clone())
            .get_managed(actor, course_id)
            .await?;

        let video = sqlx::query_as::<_, Video>(&format!(
            r#"
            INSERT INTO videos (course_id, title, description, video_url, duration_seconds, position, is_preview)
            VALUES ($1, $2, $3, $4, $5,
                    COALESCE($6, (SELECT COALESCE(MAX(position), 0) + 1 FROM videos WHERE course_id = $1)),
                    $7)
            RETURNING {}
            "#,
            VIDEO_COLUMNS
        ))
        .bind(course_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.video_url.trim())
        .bind(input.duration_seconds)
        .bind(input.position)
        .bind(input.is_preview)
        .fetch_one(&self.db)
        .await?;

        Ok(video)
    }

    pub async fn update(&self, actor: &AuthUser, id: Uuid, input: UpdateVideoInput) -> AppResult<Video> {
        input.validate()?;
        let existing = self.get(id).await?;
        CourseService::new(self.db.clone())
            .get_managed(actor, existing.course_id)
            .await?;

        let video = sqlx::query_as::<_, Video>(&format!(
            r#"
            UPDATE videos
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                video_url = COALESCE($4, video_url),
                duration_seconds = COALESCE($5, duration_seconds),
                position = COALESCE($6, position),
                is_preview = COALESCE($7, is_preview),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            VIDEO_COLUMNS
        ))
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(input.video_url.as_deref().map(str::trim))
        .bind(input.duration_seconds)
        .bind(input.position)
        .bind(input.is_preview)
        .fetch_one(&self.db)
        .await?;

        Ok(video)
    }

    /// Delete a video; returns the course it belonged to
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> AppResult<Uuid> {
        let existing = self.get(id).await?;
        CourseService::new(self.db.clone())
            .get_managed(actor, existing.course_id)
            .await?;

        sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(existing.course_id)
    }
}
