//! Video progress tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{completion_percent, merge_progress};
use crate::services::enrollment::EnrollmentService;
use crate::services::video::VideoService;

/// Progress service
#[derive(Clone)]
pub struct ProgressService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VideoProgress {
    pub id: Uuid,
    pub student_id: Uuid,
    pub video_id: Uuid,
    pub watched_seconds: i32,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProgressInput {
    #[validate(range(min = 0, message = "Watched seconds cannot be negative"))]
    #[serde(default)]
    pub watched_seconds: i32,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub course_id: Option<Uuid>,
}

/// Completion summary of one course for one student
#[derive(Debug, Serialize)]
pub struct CourseProgressSummary {
    pub course_id: Uuid,
    pub total_videos: i64,
    pub completed_videos: i64,
    pub watched_seconds: i64,
    pub completion_percent: i32,
}

const PROGRESS_COLUMNS: &str = "id, student_id, video_id, watched_seconds, completed, updated_at";

impl ProgressService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record progress on a video.
    ///
    /// Watched time never decreases and a completed video stays completed.
    pub async fn upsert(
        &self,
        viewer: &AuthUser,
        video_id: Uuid,
        input: UpdateProgressInput,
    ) -> AppResult<VideoProgress> {
        input.validate()?;

        let video = VideoService::new(self.db.clone()).get(video_id).await?;
        if !video.is_preview
            && !EnrollmentService::new(self.db.clone())
                .is_enrolled(viewer.user_id, video.course_id)
                .await?
        {
            return Err(AppError::Forbidden(
                "You are not enrolled in this course".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let stored = sqlx::query_as::<_, (i32, bool)>(
            "SELECT watched_seconds, completed FROM video_progress WHERE student_id = $1 AND video_id = $2 FOR UPDATE",
        )
        .bind(viewer.user_id)
        .bind(video_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or((0, false));

        let (watched_seconds, completed) =
            merge_progress(stored.0, stored.1, input.watched_seconds, input.completed);

        let progress = sqlx::query_as::<_, VideoProgress>(&format!(
            r#"
            INSERT INTO video_progress (student_id, video_id, watched_seconds, completed)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (student_id, video_id) DO UPDATE
            SET watched_seconds = GREATEST(video_progress.watched_seconds, EXCLUDED.watched_seconds),
                completed = video_progress.completed OR EXCLUDED.completed,
                updated_at = NOW()
            RETURNING {}
            "#,
            PROGRESS_COLUMNS
        ))
        .bind(viewer.user_id)
        .bind(video_id)
        .bind(watched_seconds)
        .bind(completed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(progress)
    }

    /// The caller's progress rows, optionally for one course
    pub async fn list(&self, student_id: Uuid, course_id: Option<Uuid>) -> AppResult<Vec<VideoProgress>> {
        let rows = sqlx::query_as::<_, VideoProgress>(
            r#"
            SELECT vp.id, vp.student_id, vp.video_id, vp.watched_seconds, vp.completed, vp.updated_at
            FROM video_progress vp
            JOIN videos v ON v.id = vp.video_id
            WHERE vp.student_id = $1 AND ($2::uuid IS NULL OR v.course_id = $2)
            ORDER BY v.course_id, v.position
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Completion figures of one course
    pub async fn course_summary(&self, student_id: Uuid, course_id: Uuid) -> AppResult<CourseProgressSummary> {
        let (total_videos, completed_videos, watched_seconds) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(v.id),
                   COUNT(vp.id) FILTER (WHERE vp.completed),
                   COALESCE(SUM(vp.watched_seconds), 0)::BIGINT
            FROM videos v
            LEFT JOIN video_progress vp ON vp.video_id = v.id AND vp.student_id = $1
            WHERE v.course_id = $2
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(&self.db)
        .await?;

        Ok(CourseProgressSummary {
            course_id,
            total_videos,
            completed_videos,
            watched_seconds,
            completion_percent: completion_percent(completed_videos, total_videos),
        })
    }
}
