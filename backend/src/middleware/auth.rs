//! Authentication middleware
//!
//! Bearer JWT authentication and role checks

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Role;
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated user information extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Fail with 403 unless the caller is an admin
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Fail with 403 unless the caller is an admin or a teacher
    pub fn require_staff(&self) -> AppResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Admin or teacher access required".to_string(),
            ))
        }
    }
}

/// Authentication middleware that validates JWT tokens.
///
/// The token comes from the `Authorization: Bearer` header, or from an
/// `access_token` query parameter for clients that cannot set headers
/// (browser `EventSource`).
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer {
        Some(TypedHeader(Authorization(bearer))) => Some(bearer.token().to_string()),
        None => query_token(request.uri().query()),
    };

    let Some(token) = token else {
        return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
            .into_response();
    };

    let claims = match decode_access_token(&token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => {
            return AppError::Unauthorized("Invalid user ID in token".to_string()).into_response()
        }
    };

    request.extensions_mut().insert(AuthUser {
        user_id,
        email: claims.email,
        role: claims.role,
    });

    next.run(request).await
}

/// Pull `access_token` out of a raw query string
fn query_token(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "access_token")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_role_guards() {
        assert!(user(Role::Admin).require_admin().is_ok());
        assert!(user(Role::Teacher).require_admin().is_err());
        assert!(user(Role::Teacher).require_staff().is_ok());
        assert!(matches!(
            user(Role::Student).require_staff(),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_query_token() {
        assert_eq!(
            query_token(Some("tables=courses&access_token=abc.def")).as_deref(),
            Some("abc.def")
        );
        assert_eq!(query_token(Some("access_token=")), None);
        assert_eq!(query_token(Some("tables=courses")), None);
        assert_eq!(query_token(None), None);
    }
}
