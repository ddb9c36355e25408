//! Authentication service for registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::Role;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for self-registration (always creates a student)
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 120, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub phone: Option<String>,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Profile ID
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user_id: Uuid,
    pub role: Role,
}

/// Credentials row from the profiles table
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    role: Role,
    password_hash: String,
    is_active: bool,
}

/// Sign an access token for a profile
pub fn encode_access_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    role: Role,
    ttl_seconds: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Hash a refresh token for storage
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new student profile and sign it in
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthTokens> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles WHERE email = $1")
                .bind(&email)
                .fetch_one(&self.db)
                .await?;

        if existing > 0 {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO profiles (email, full_name, phone, role, password_hash)
            VALUES ($1, $2, $3, 'student', $4)
            RETURNING id
            "#,
        )
        .bind(&email)
        .bind(input.full_name.trim())
        .bind(&input.phone)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%user_id, "Registered new student");

        self.issue_tokens(user_id, &email, Role::Student).await
    }

    /// Authenticate with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, email, role, password_hash, is_active
            FROM profiles
            WHERE email = $1
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE profiles SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        self.issue_tokens(user.id, &user.email, user.role).await
    }

    /// Exchange a refresh token for a new token pair (the old one is revoked)
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = hash_token(refresh_token);

        let mut tx = self.db.begin().await?;

        let (user_id, email, role) = sqlx::query_as::<_, (Uuid, String, Role)>(
            r#"
            UPDATE refresh_tokens rt
            SET revoked_at = NOW()
            FROM profiles p
            WHERE rt.token_hash = $1
              AND p.id = rt.profile_id
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND p.is_active = TRUE
            RETURNING p.id, p.email, p.role
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        tx.commit().await?;

        self.issue_tokens(user_id, &email, role).await
    }

    /// Revoke a refresh token
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(hash_token(refresh_token))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Generate and persist a token pair
    async fn issue_tokens(&self, user_id: Uuid, email: &str, role: Role) -> AppResult<AuthTokens> {
        let access_token = encode_access_token(
            &self.jwt_secret,
            user_id,
            email,
            role,
            self.access_token_expiry,
        )?;

        let refresh_token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (profile_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(&refresh_token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            user_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trip() {
        let id = Uuid::new_v4();
        let token = encode_access_token("secret", id, "t@example.com", Role::Teacher, 60).unwrap();
        let claims = decode_access_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.role, Role::Teacher);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token =
            encode_access_token("secret", Uuid::new_v4(), "t@example.com", Role::Admin, 60).unwrap();
        let err = decode_access_token(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Beyond the default 60s leeway
        let token =
            encode_access_token("secret", Uuid::new_v4(), "t@example.com", Role::Admin, -300)
                .unwrap();
        assert!(decode_access_token(&token, "secret").is_err());
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let h = hash_token("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_token("abc"));
        assert_ne!(h, hash_token("abd"));
    }

    #[test]
    fn test_register_input_validation() {
        let input = RegisterInput {
            full_name: "Rahim".to_string(),
            email: "not-an-email".to_string(),
            password: "password123".to_string(),
            phone: None,
        };
        let err: AppError = input.validate().unwrap_err().into();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "email"));
    }
}
