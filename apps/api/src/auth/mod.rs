//! Authentication and role-based authorization.
//!
//! `authenticate` turns a bearer credential into a loaded `User`; handlers
//! receive that user explicitly through the `CurrentUser` extractor and pass
//! it to `authorize` / `ensure_owner` when an operation is role-gated.

pub mod handlers;
pub mod jwt;
pub mod password;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::errors::AppError;
use crate::models::job::Job;
use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::store::UserRepository;

pub use jwt::{JwtConfig, JwtManager};

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header =
        header.ok_or_else(|| AppError::Unauthenticated("Missing bearer token".to_string()))?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthenticated("Malformed authorization header".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Unauthenticated(
            "Malformed authorization header".to_string(),
        ));
    }
    Ok(token.trim())
}

/// Resolves a bearer credential to exactly one user. Read-only.
pub async fn authenticate<S>(
    store: &S,
    jwt: &JwtManager,
    authorization: Option<&str>,
) -> Result<User, AppError>
where
    S: UserRepository + ?Sized,
{
    let token = bearer_token(authorization)?;
    let claims = jwt.verify(token)?;
    let user_id = claims.subject()?;
    store.find_user(user_id).await?.ok_or_else(|| {
        AppError::Unauthenticated("Token refers to an unknown user".to_string())
    })
}

/// Exact role match; any mismatch is `Forbidden`.
pub fn authorize(user: &User, required: Role) -> Result<(), AppError> {
    if user.role != required {
        return Err(AppError::Forbidden(format!(
            "Unauthorized for this role (requires {})",
            required.as_str()
        )));
    }
    Ok(())
}

/// Only the creating coordinator may change or remove a job.
pub fn ensure_owner(user: &User, job: &Job) -> Result<(), AppError> {
    if !job.is_owned_by(user.id) {
        return Err(AppError::Forbidden(
            "Only the coordinator who posted this job may manage it".to_string(),
        ));
    }
    Ok(())
}

/// The authenticated caller, loaded fresh from the store for every request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        match authenticate(state.store.as_ref(), &state.jwt, header).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(err) => {
                if let AppError::Unauthenticated(reason) = &err {
                    warn!(path = %parts.uri.path(), "Authentication rejected: {reason}");
                }
                Err(err)
            }
        }
    }
}
