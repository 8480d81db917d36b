//! Axum route handlers for registration and login.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::models::user::{FullName, Role, User};
use crate::state::AppState;
use crate::store::{UserRepository, EMAIL_UNIQUE, SINGLE_COORDINATOR};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: FullName,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        let email = normalize_email(&self.email);
        let valid_email = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
            .unwrap_or(false);
        if !valid_email {
            return Err(AppError::Validation("email is not a valid address".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.name.first.trim().is_empty() {
            return Err(AppError::Validation("name.first cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Creates an account. A coordinator account is admitted only while none
/// exists; the store re-checks the role count inside the insert transaction.
pub async fn register<S>(store: &S, request: RegisterRequest) -> Result<User, AppError>
where
    S: UserRepository + ?Sized,
{
    request.validate()?;

    if request.role == Role::Coordinator
        && store.count_users_with_role(Role::Coordinator).await? > 0
    {
        return Err(AppError::Conflict(
            "A coordinator account already exists".to_string(),
        ));
    }

    let email = normalize_email(&request.email);
    let password_hash = hash_password(request.password).await?;
    let user = User::new(email, password_hash, request.role, request.name, Utc::now());

    store.insert_user(&user).await.map_err(|err| match err {
        e if e.is_duplicate_of(EMAIL_UNIQUE) => {
            AppError::Conflict("Email is already registered".to_string())
        }
        e if e.is_duplicate_of(SINGLE_COORDINATOR) => {
            AppError::Conflict("A coordinator account already exists".to_string())
        }
        e => AppError::from(e),
    })?;

    info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    Ok(user)
}

/// Same error for an unknown email and a wrong password.
pub async fn login<S>(store: &S, request: LoginRequest) -> Result<User, AppError>
where
    S: UserRepository + ?Sized,
{
    let invalid = || AppError::Unauthenticated("Invalid email or password".to_string());
    let email = normalize_email(&request.email);

    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!("Login attempt for unknown email");
        return Err(invalid());
    };
    if !verify_password(request.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "Login attempt with wrong password");
        return Err(invalid());
    }
    Ok(user)
}

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        access_token: state.jwt.issue(&user)?,
        token_type: "Bearer",
        expires_in: state.jwt.ttl().num_seconds(),
        user,
    })
}

/// POST /register
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = register(state.store.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(auth_response(&state, user)?)))
}

/// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = login(state.store.as_ref(), request).await?;
    Ok(Json(auth_response(&state, user)?))
}
