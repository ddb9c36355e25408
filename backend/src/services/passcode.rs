//! Passcode service
//!
//! Admins hand out passcodes that unlock a set of courses. A passcode may be
//! pre-assigned to a student; otherwise the first student to redeem it claims
//! it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::{
    format_passcode, normalize_passcode, validate_passcode, EnrollmentSource, PASSCODE_ALPHABET,
    PASSCODE_GROUPS, PASSCODE_GROUP_LEN,
};
use crate::services::enrollment::enroll;

/// Attempts at finding an unused code before giving up
const MAX_GENERATE_ATTEMPTS: usize = 5;

/// Passcode service
#[derive(Clone)]
pub struct PasscodeService {
    db: PgPool,
}

/// Passcode with the courses it grants
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Passcode {
    pub id: Uuid,
    pub code: String,
    pub student_id: Option<Uuid>,
    pub student_name: Option<String>,
    pub note: Option<String>,
    pub is_active: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub course_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePasscodeInput {
    #[validate(length(min = 1, message = "At least one course is required"))]
    pub course_ids: Vec<Uuid>,
    pub student_id: Option<Uuid>,
    #[validate(length(max = 500, message = "Note is too long"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemPasscodeInput {
    pub code: String,
}

/// Outcome of a redemption
#[derive(Debug, Serialize)]
pub struct RedeemResult {
    pub passcode_id: Uuid,
    pub course_ids: Vec<Uuid>,
    /// Courses the student was not enrolled in before
    pub newly_enrolled: Vec<Uuid>,
}

#[derive(Debug, FromRow)]
struct PasscodeLock {
    id: Uuid,
    student_id: Option<Uuid>,
    is_active: bool,
}

const PASSCODE_SELECT: &str = r#"
    SELECT p.id, p.code, p.student_id, s.full_name AS student_name, p.note, p.is_active,
           p.redeemed_at, p.created_by, p.created_at,
           COALESCE(ARRAY_AGG(pc.course_id) FILTER (WHERE pc.course_id IS NOT NULL), '{}') AS course_ids
    FROM passcodes p
    LEFT JOIN profiles s ON s.id = p.student_id
    LEFT JOIN passcode_courses pc ON pc.passcode_id = p.id
"#;

/// Draw a random `XXXX-XXXX-XXXX` passcode
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let indices: Vec<usize> = (0..PASSCODE_GROUPS * PASSCODE_GROUP_LEN)
        .map(|_| rng.gen_range(0..PASSCODE_ALPHABET.len()))
        .collect();
    format_passcode(&indices)
}

impl PasscodeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Passcode> {
        sqlx::query_as::<_, Passcode>(&format!(
            "{} WHERE p.id = $1 GROUP BY p.id, s.full_name",
            PASSCODE_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Passcode".to_string()))
    }

    /// All passcodes, newest first
    pub async fn list(&self) -> AppResult<Vec<Passcode>> {
        let passcodes = sqlx::query_as::<_, Passcode>(&format!(
            "{} GROUP BY p.id, s.full_name ORDER BY p.created_at DESC",
            PASSCODE_SELECT
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(passcodes)
    }

    /// Generate a passcode granting the given courses
    pub async fn create(&self, created_by: Uuid, input: CreatePasscodeInput) -> AppResult<Passcode> {
        input.validate()?;

        let mut course_ids = input.course_ids.clone();
        course_ids.sort();
        course_ids.dedup();

        let known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses WHERE id = ANY($1)")
            .bind(&course_ids)
            .fetch_one(&self.db)
            .await?;
        if known != course_ids.len() as i64 {
            return Err(AppError::validation("course_ids", "Unknown course in passcode"));
        }

        for attempt in 1..=MAX_GENERATE_ATTEMPTS {
            let code = generate_code(&mut rand::thread_rng());

            let mut tx = self.db.begin().await?;
            let inserted = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO passcodes (code, student_id, note, created_by)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(&code)
            .bind(input.student_id)
            .bind(&input.note)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await;

            let id = match inserted {
                Ok(id) => id,
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!(attempt, "Passcode collision, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            sqlx::query(
                r#"
                INSERT INTO passcode_courses (passcode_id, course_id)
                SELECT $1, UNNEST($2::uuid[])
                "#,
            )
            .bind(id)
            .bind(&course_ids)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            tracing::info!(passcode_id = %id, courses = course_ids.len(), "Passcode created");
            return self.get(id).await;
        }

        Err(AppError::Internal(
            "Could not generate a unique passcode".to_string(),
        ))
    }

    /// Activate or deactivate a passcode
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> AppResult<Passcode> {
        let updated = sqlx::query("UPDATE passcodes SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.db)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Passcode".to_string()));
        }

        self.get(id).await
    }

    /// Redeem a passcode and enroll the student in every granted course
    pub async fn redeem(&self, student_id: Uuid, raw_code: &str) -> AppResult<RedeemResult> {
        let code = normalize_passcode(raw_code);
        validate_passcode(&code).map_err(|msg| AppError::validation("code", msg))?;

        let mut tx = self.db.begin().await?;

        let passcode = sqlx::query_as::<_, PasscodeLock>(
            "SELECT id, student_id, is_active FROM passcodes WHERE code = $1 FOR UPDATE",
        )
        .bind(&code)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Passcode".to_string()))?;

        if !passcode.is_active {
            return Err(AppError::Conflict("Passcode is no longer active".to_string()));
        }

        match passcode.student_id {
            Some(owner) if owner != student_id => {
                return Err(AppError::Conflict(
                    "Passcode is assigned to another student".to_string(),
                ));
            }
            _ => {
                sqlx::query(
                    r#"
                    UPDATE passcodes
                    SET student_id = $2, redeemed_at = COALESCE(redeemed_at, NOW())
                    WHERE id = $1
                    "#,
                )
                .bind(passcode.id)
                .bind(student_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let course_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT course_id FROM passcode_courses WHERE passcode_id = $1 ORDER BY course_id",
        )
        .bind(passcode.id)
        .fetch_all(&mut *tx)
        .await?;

        let mut newly_enrolled = Vec::new();
        for course_id in &course_ids {
            let (_, created) = enroll(
                &mut *tx,
                student_id,
                *course_id,
                EnrollmentSource::Passcode,
                None,
            )
            .await?;
            if created {
                newly_enrolled.push(*course_id);
            }
        }

        tx.commit().await?;

        tracing::info!(
            passcode_id = %passcode.id,
            %student_id,
            enrolled = newly_enrolled.len(),
            "Passcode redeemed"
        );

        Ok(RedeemResult {
            passcode_id: passcode.id,
            course_ids,
            newly_enrolled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_generated_codes_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), 14);
            assert!(validate_passcode(&code).is_ok(), "{}", code);
        }
    }

    #[test]
    fn test_generated_codes_avoid_ambiguous_characters() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let code = generate_code(&mut rng);
            assert!(!code.contains(['0', 'O', '1', 'I', 'L']));
        }
    }
}
