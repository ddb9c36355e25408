//! Certificate issuance and public verification

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{is_unique_violation, AppError, AppResult};
use crate::models::{
    format_certificate_id, normalize_certificate_id, validate_certificate_id,
    CertificateVerification,
};

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 8;
const MAX_ISSUE_ATTEMPTS: usize = 5;

/// Certificate service
#[derive(Clone)]
pub struct CertificateService {
    db: PgPool,
}

/// Full certificate record (staff and owner views)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub certificate_id: String,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub student_name: String,
    pub course_name: String,
    pub issued_by: Option<Uuid>,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct IssueCertificateInput {
    pub student_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Debug, FromRow)]
struct PublicRow {
    certificate_id: String,
    course_name: String,
    issued_at: DateTime<Utc>,
}

const CERTIFICATE_COLUMNS: &str =
    "id, certificate_id, student_id, course_id, student_name, course_name, issued_by, issued_at";

/// Extract and normalize the ID from a verification request body
pub fn parse_certificate_id(raw: Option<&serde_json::Value>) -> AppResult<String> {
    let id = raw
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("certificate_id", "Certificate ID is required"))?;

    let id = normalize_certificate_id(id);
    validate_certificate_id(&id)
        .map_err(|_| AppError::validation("certificate_id", "Invalid certificate ID format"))?;
    Ok(id)
}

/// Random suffix for a new certificate ID
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

impl CertificateService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Public lookup; the result carries no student identity
    pub async fn verify_public(&self, certificate_id: &str) -> AppResult<CertificateVerification> {
        let row = sqlx::query_as::<_, PublicRow>(
            "SELECT certificate_id, course_name, issued_at FROM certificates WHERE certificate_id = $1",
        )
        .bind(certificate_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Certificate".to_string()))?;

        Ok(CertificateVerification {
            certificate_id: row.certificate_id,
            course_name: row.course_name,
            issued_at: row.issued_at,
            is_valid: true,
        })
    }

    /// Issue a certificate for a student and course
    pub async fn issue(&self, issued_by: Uuid, input: IssueCertificateInput) -> AppResult<Certificate> {
        let student_name = sqlx::query_scalar::<_, String>("SELECT full_name FROM profiles WHERE id = $1")
            .bind(input.student_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Student".to_string()))?;

        let course_name = sqlx::query_scalar::<_, String>("SELECT title FROM courses WHERE id = $1")
            .bind(input.course_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Course".to_string()))?;

        let already_issued = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM certificates WHERE student_id = $1 AND course_id = $2)",
        )
        .bind(input.student_id)
        .bind(input.course_id)
        .fetch_one(&self.db)
        .await?;
        if already_issued {
            return Err(AppError::Conflict(
                "A certificate was already issued for this course".to_string(),
            ));
        }

        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let certificate_id =
                format_certificate_id(Utc::now().date_naive(), &random_suffix(&mut rand::thread_rng()));

            let result = sqlx::query_as::<_, Certificate>(&format!(
                r#"
                INSERT INTO certificates (certificate_id, student_id, course_id, student_name, course_name, issued_by)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                CERTIFICATE_COLUMNS
            ))
            .bind(&certificate_id)
            .bind(input.student_id)
            .bind(input.course_id)
            .bind(&student_name)
            .bind(&course_name)
            .bind(issued_by)
            .fetch_one(&self.db)
            .await;

            match result {
                Ok(certificate) => {
                    tracing::info!(certificate_id = %certificate.certificate_id, "Certificate issued");
                    return Ok(certificate);
                }
                Err(sqlx::Error::Database(db)) if db.constraint() == Some("certificates_student_id_course_id_key") => {
                    return Err(AppError::Conflict(
                        "A certificate was already issued for this course".to_string(),
                    ));
                }
                Err(e) if is_unique_violation(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "Could not generate a unique certificate ID".to_string(),
        ))
    }

    /// Every certificate, newest first
    pub async fn list_all(&self) -> AppResult<Vec<Certificate>> {
        let certificates = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {} FROM certificates ORDER BY issued_at DESC",
            CERTIFICATE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(certificates)
    }

    pub async fn list_for_student(&self, student_id: Uuid) -> AppResult<Vec<Certificate>> {
        let certificates = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {} FROM certificates WHERE student_id = $1 ORDER BY issued_at DESC",
            CERTIFICATE_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;
        Ok(certificates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    #[test]
    fn test_parse_certificate_id_normalizes() {
        let id = parse_certificate_id(Some(&json!("  cert-20250314-abcd1234 "))).unwrap();
        assert_eq!(id, "CERT-20250314-ABCD1234");
    }

    #[test]
    fn test_parse_certificate_id_missing_or_wrong_type() {
        assert!(parse_certificate_id(None).is_err());
        assert!(parse_certificate_id(Some(&json!(12345678901_i64))).is_err());
        assert!(parse_certificate_id(Some(&json!("   "))).is_err());
    }

    #[test]
    fn test_parse_certificate_id_bad_format() {
        let err = parse_certificate_id(Some(&json!("CERT-1"))).unwrap_err();
        match err {
            AppError::Validation { message, .. } => assert_eq!(message, "Invalid certificate ID format"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(parse_certificate_id(Some(&json!("CERT_2025_0314_X"))).is_err());
    }

    #[test]
    fn test_issued_ids_verify() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let id = format_certificate_id(Utc::now().date_naive(), &random_suffix(&mut rng));
            assert_eq!(parse_certificate_id(Some(&json!(id))).unwrap(), id);
        }
    }
}
