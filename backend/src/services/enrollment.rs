//! Enrollment service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{completion_percent, EnrollmentSource};

/// Enrollment service
#[derive(Clone)]
pub struct EnrollmentService {
    db: PgPool,
}

/// Enrollment record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub source: EnrollmentSource,
    pub invoice_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A course the student is enrolled in, with progress
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EnrolledCourse {
    pub course_id: Uuid,
    pub title: String,
    pub slug: String,
    pub thumbnail_url: Option<String>,
    pub price: Decimal,
    pub source: EnrollmentSource,
    pub enrolled_at: DateTime<Utc>,
    pub total_videos: i64,
    pub completed_videos: i64,
    #[sqlx(default)]
    pub completion_percent: i32,
}

/// Admin input for a manual enrollment
#[derive(Debug, Deserialize)]
pub struct ManualEnrollmentInput {
    pub student_id: Uuid,
    pub course_id: Uuid,
}

/// Enroll a student; an existing enrollment is returned unchanged.
///
/// Returns the enrollment and whether it was newly created.
pub async fn enroll<'e, E>(
    executor: E,
    student_id: Uuid,
    course_id: Uuid,
    source: EnrollmentSource,
    invoice_id: Option<&str>,
) -> AppResult<(Enrollment, bool)>
where
    E: PgExecutor<'e>,
{
    // The no-op update makes RETURNING yield the existing row on conflict
    let (enrollment, inserted) = sqlx::query_as::<_, (Uuid, Uuid, Uuid, EnrollmentSource, Option<String>, DateTime<Utc>, bool)>(
        r#"
        INSERT INTO enrollments (student_id, course_id, source, invoice_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, course_id)
        DO UPDATE SET student_id = EXCLUDED.student_id
        RETURNING id, student_id, course_id, source, invoice_id, created_at, (xmax = 0) AS inserted
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .bind(source)
    .bind(invoice_id)
    .fetch_one(executor)
    .await
    .map(|(id, student_id, course_id, source, invoice_id, created_at, inserted)| {
        (
            Enrollment {
                id,
                student_id,
                course_id,
                source,
                invoice_id,
                created_at,
            },
            inserted,
        )
    })?;

    if inserted {
        tracing::info!(%student_id, %course_id, ?source, "Student enrolled");
    }

    Ok((enrollment, inserted))
}

impl EnrollmentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Manually enroll a student (admin)
    pub async fn enroll_manual(&self, input: ManualEnrollmentInput) -> AppResult<(Enrollment, bool)> {
        let profile_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM profiles WHERE id = $1)",
        )
        .bind(input.student_id)
        .fetch_one(&self.db)
        .await?;
        if !profile_exists {
            return Err(AppError::NotFound("Student".to_string()));
        }

        let course_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1)")
                .bind(input.course_id)
                .fetch_one(&self.db)
                .await?;
        if !course_exists {
            return Err(AppError::NotFound("Course".to_string()));
        }

        enroll(
            &self.db,
            input.student_id,
            input.course_id,
            EnrollmentSource::Manual,
            None,
        )
        .await
    }

    /// Whether the student is enrolled in the course
    pub async fn is_enrolled(&self, student_id: Uuid, course_id: Uuid) -> AppResult<bool> {
        let enrolled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM enrollments WHERE student_id = $1 AND course_id = $2)",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(&self.db)
        .await?;
        Ok(enrolled)
    }

    /// Courses the student is enrolled in, with completion figures
    pub async fn my_courses(&self, student_id: Uuid) -> AppResult<Vec<EnrolledCourse>> {
        let mut courses = sqlx::query_as::<_, EnrolledCourse>(
            r#"
            SELECT c.id AS course_id, c.title, c.slug, c.thumbnail_url, c.price,
                   e.source, e.created_at AS enrolled_at,
                   (SELECT COUNT(*) FROM videos v WHERE v.course_id = c.id) AS total_videos,
                   (SELECT COUNT(*) FROM video_progress vp
                      JOIN videos v ON v.id = vp.video_id
                     WHERE v.course_id = c.id AND vp.student_id = e.student_id AND vp.completed)
                       AS completed_videos
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.student_id = $1
            ORDER BY e.created_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        for course in &mut courses {
            course.completion_percent =
                completion_percent(course.completed_videos, course.total_videos);
        }

        Ok(courses)
    }
}
