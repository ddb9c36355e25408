//! Course catalogue service
//!
//! Public listing of published courses plus staff management. Teachers manage
//! only the courses they own; admins manage everything.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{slugify, validate_amount, validate_slug};

/// Course service
#[derive(Clone)]
pub struct CourseService {
    db: PgPool,
}

/// Course record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub price: Decimal,
    pub teacher_id: Option<Uuid>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course as shown in listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseListing {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub price: Decimal,
    pub teacher_id: Option<Uuid>,
    pub teacher_name: Option<String>,
    pub is_published: bool,
    pub video_count: i64,
    pub total_duration_seconds: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a course
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseInput {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub price: Decimal,
    /// Only honoured for admins; teachers always own what they create
    pub teacher_id: Option<Uuid>,
    #[serde(default)]
    pub is_published: bool,
}

/// Input for updating a course
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourseInput {
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub price: Option<Decimal>,
    pub teacher_id: Option<Uuid>,
    pub is_published: Option<bool>,
}

const COURSE_COLUMNS: &str = "id, title, slug, description, thumbnail_url, price, teacher_id, \
                              is_published, created_at, updated_at";

const LISTING_SELECT: &str = r#"
    SELECT c.id, c.title, c.slug, c.description, c.thumbnail_url, c.price,
           c.teacher_id, p.full_name AS teacher_name, c.is_published,
           COUNT(v.id) AS video_count,
           COALESCE(SUM(v.duration_seconds), 0)::BIGINT AS total_duration_seconds,
           c.created_at
    FROM courses c
    LEFT JOIN profiles p ON p.id = c.teacher_id
    LEFT JOIN videos v ON v.course_id = c.id
"#;

fn validate_price(price: Decimal) -> AppResult<()> {
    if price.is_sign_negative() {
        return Err(AppError::validation("price", "Price cannot be negative"));
    }
    if price > Decimal::ZERO {
        validate_amount(price).map_err(|msg| AppError::validation("price", msg))?;
    }
    Ok(())
}

fn resolve_slug(slug: Option<&str>, title: &str) -> AppResult<String> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => slugify(title),
    };
    validate_slug(&slug).map_err(|msg| AppError::validation("slug", msg))?;
    Ok(slug)
}

fn map_slug_conflict(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict("A course with this slug already exists".to_string())
    } else {
        err.into()
    }
}

impl CourseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Published courses for the public catalogue
    pub async fn list_published(&self) -> AppResult<Vec<CourseListing>> {
        let courses = sqlx::query_as::<_, CourseListing>(&format!(
            "{} WHERE c.is_published = TRUE GROUP BY c.id, p.full_name ORDER BY c.created_at DESC",
            LISTING_SELECT
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(courses)
    }

    /// Published course by slug
    pub async fn get_published_by_slug(&self, slug: &str) -> AppResult<CourseListing> {
        sqlx::query_as::<_, CourseListing>(&format!(
            "{} WHERE c.slug = $1 AND c.is_published = TRUE GROUP BY c.id, p.full_name",
            LISTING_SELECT
        ))
        .bind(slug.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Course".to_string()))
    }

    /// Courses the caller may manage (all for admins, own for teachers)
    pub async fn list_managed(&self, actor: &AuthUser) -> AppResult<Vec<CourseListing>> {
        actor.require_staff()?;
        let owner = if actor.is_admin() { None } else { Some(actor.user_id) };

        let courses = sqlx::query_as::<_, CourseListing>(&format!(
            "{} WHERE ($1::uuid IS NULL OR c.teacher_id = $1) GROUP BY c.id, p.full_name ORDER BY c.created_at DESC",
            LISTING_SELECT
        ))
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        Ok(courses)
    }

    /// Get a course by ID regardless of publication state
    pub async fn get(&self, id: Uuid) -> AppResult<Course> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Course".to_string()))
    }

    /// Load a course and check that the caller may manage it
    pub async fn get_managed(&self, actor: &AuthUser, id: Uuid) -> AppResult<Course> {
        actor.require_staff()?;
        let course = self.get(id).await?;
        if !actor.is_admin() && course.teacher_id != Some(actor.user_id) {
            return Err(AppError::Forbidden(
                "You can only manage your own courses".to_string(),
            ));
        }
        Ok(course)
    }

    /// Create a course
    pub async fn create(&self, actor: &AuthUser, input: CreateCourseInput) -> AppResult<Course> {
        actor.require_staff()?;
        input.validate()?;
        validate_price(input.price)?;
        let slug = resolve_slug(input.slug.as_deref(), &input.title)?;

        let teacher_id = if actor.is_admin() {
            input.teacher_id
        } else {
            Some(actor.user_id)
        };

        let course = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (title, slug, description, thumbnail_url, price, teacher_id, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            COURSE_COLUMNS
        ))
        .bind(input.title.trim())
        .bind(&slug)
        .bind(&input.description)
        .bind(&input.thumbnail_url)
        .bind(input.price)
        .bind(teacher_id)
        .bind(input.is_published)
        .fetch_one(&self.db)
        .await
        .map_err(map_slug_conflict)?;

        tracing::info!(course_id = %course.id, slug = %course.slug, "Course created");
        Ok(course)
    }

    /// Update a course
    pub async fn update(
        &self,
        actor: &AuthUser,
        id: Uuid,
        input: UpdateCourseInput,
    ) -> AppResult<Course> {
        input.validate()?;
        let existing = self.get_managed(actor, id).await?;

        if let Some(price) = input.price {
            validate_price(price)?;
        }
        let slug = match input.slug.as_deref() {
            Some(slug) => Some(resolve_slug(Some(slug), &existing.title)?),
            None => None,
        };
        // Reassigning ownership is an admin decision
        let teacher_id = if actor.is_admin() {
            input.teacher_id.or(existing.teacher_id)
        } else {
            existing.teacher_id
        };

        let course = sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses
            SET title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                thumbnail_url = COALESCE($5, thumbnail_url),
                price = COALESCE($6, price),
                teacher_id = $7,
                is_published = COALESCE($8, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COURSE_COLUMNS
        ))
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(&slug)
        .bind(&input.description)
        .bind(&input.thumbnail_url)
        .bind(input.price)
        .bind(teacher_id)
        .bind(input.is_published)
        .fetch_one(&self.db)
        .await
        .map_err(map_slug_conflict)?;

        Ok(course)
    }

    /// Delete a course and, by cascade, its videos and enrollments
    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> AppResult<()> {
        self.get_managed(actor, id).await?;

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(course_id = %id, "Course deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_slug_from_title() {
        assert_eq!(resolve_slug(None, "Intro to Rust!").unwrap(), "intro-to-rust");
        assert_eq!(
            resolve_slug(Some("  "), "Web Design 101").unwrap(),
            "web-design-101"
        );
    }

    #[test]
    fn test_resolve_slug_rejects_bad_slug() {
        let err = resolve_slug(Some("Bad Slug"), "x").unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "slug"));
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::new(150000, 2)).is_ok());
        assert!(validate_price(Decimal::new(-1, 0)).is_err());
        assert!(validate_price(Decimal::new(1001, 3)).is_err());
    }
}
