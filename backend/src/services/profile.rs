//! Profile service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{PaginatedResponse, Pagination, Role};

/// Profile service
#[derive(Clone)]
pub struct ProfileService {
    db: PgPool,
}

/// Public profile record (never carries the password hash)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Self-service profile update
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 120, message = "Full name cannot be empty"))]
    pub full_name: Option<String>,
    #[validate(length(max = 30, message = "Phone number is too long"))]
    pub phone: Option<String>,
    #[validate(url(message = "Avatar must be a URL"))]
    pub avatar_url: Option<String>,
}

/// Filters for the admin profile list
#[derive(Debug, Default, Deserialize)]
pub struct ProfileFilter {
    pub role: Option<Role>,
    pub search: Option<String>,
}

const PROFILE_COLUMNS: &str = "id, email, full_name, phone, avatar_url, role, is_active, \
                               last_login_at, created_at, updated_at";

impl ProfileService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a profile by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Profile> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))
    }

    /// Update the caller's own profile
    pub async fn update_me(&self, id: Uuid, input: UpdateProfileInput) -> AppResult<Profile> {
        input.validate()?;

        sqlx::query_as::<_, Profile>(&format!(
            r#"
            UPDATE profiles
            SET full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(input.full_name.as_deref().map(str::trim))
        .bind(&input.phone)
        .bind(&input.avatar_url)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))
    }

    /// List profiles, newest first
    pub async fn list(
        &self,
        filter: &ProfileFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Profile>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM profiles
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR email LIKE $2 OR LOWER(full_name) LIKE $2)
            "#,
        )
        .bind(filter.role)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let profiles = sqlx::query_as::<_, Profile>(&format!(
            r#"
            SELECT {} FROM profiles
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR email LIKE $2 OR LOWER(full_name) LIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            PROFILE_COLUMNS
        ))
        .bind(filter.role)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(profiles, pagination, total as u64))
    }

    /// Change a profile's role. Admins cannot demote themselves.
    pub async fn set_role(&self, actor_id: Uuid, id: Uuid, role: Role) -> AppResult<Profile> {
        if actor_id == id && role != Role::Admin {
            return Err(AppError::BadRequest(
                "Admins cannot remove their own admin role".to_string(),
            ));
        }

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;

        tracing::info!(profile_id = %id, role = %role, "Profile role changed");
        Ok(profile)
    }

    /// Enable or disable sign-in for a profile
    pub async fn set_active(&self, actor_id: Uuid, id: Uuid, is_active: bool) -> AppResult<Profile> {
        if actor_id == id && !is_active {
            return Err(AppError::BadRequest(
                "Admins cannot deactivate themselves".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;

        if !is_active {
            sqlx::query(
                "UPDATE refresh_tokens SET revoked_at = NOW() WHERE profile_id = $1 AND revoked_at IS NULL",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(profile)
    }
}
