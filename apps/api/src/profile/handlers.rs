//! Axum route handlers for the caller's own profile.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::extract::{parse_id, ApiJson};
use crate::models::user::{Experience, User};
use crate::profile::update::{check_date_order, ExperienceInput, ExperienceUpdate, ProfileUpdate};
use crate::state::AppState;
use crate::store::UserRepository;

fn experience_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Experience {id} not found"))
}

pub async fn update_profile<S>(
    store: &S,
    user: &User,
    update: ProfileUpdate,
) -> Result<User, AppError>
where
    S: UserRepository + ?Sized,
{
    update.validate()?;
    let updated = store
        .update_profile(user.id, &update, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;
    info!(user_id = %updated.id, "Profile updated");
    Ok(updated)
}

pub async fn add_experience<S>(
    store: &S,
    user: &User,
    input: ExperienceInput,
) -> Result<Experience, AppError>
where
    S: UserRepository + ?Sized,
{
    let entry = input.into_experience()?;
    store.add_experience(user.id, &entry).await?;
    info!(user_id = %user.id, experience_id = %entry.id, "Experience added");
    Ok(entry)
}

/// Patches one of the caller's entries. Date order is checked on the merged
/// entry, not just the fields in the request.
pub async fn update_experience<S>(
    store: &S,
    user: &User,
    experience_id: Uuid,
    update: ExperienceUpdate,
) -> Result<Experience, AppError>
where
    S: UserRepository + ?Sized,
{
    update.validate()?;
    let mut merged = user
        .experience
        .iter()
        .find(|e| e.id == experience_id)
        .cloned()
        .ok_or_else(|| experience_not_found(experience_id))?;
    update.apply_to(&mut merged);
    check_date_order(merged.start_date, merged.end_date)?;

    store
        .update_experience(user.id, experience_id, &update)
        .await?
        .ok_or_else(|| experience_not_found(experience_id))
}

pub async fn delete_experience<S>(
    store: &S,
    user: &User,
    experience_id: Uuid,
) -> Result<(), AppError>
where
    S: UserRepository + ?Sized,
{
    if !store.delete_experience(user.id, experience_id).await? {
        return Err(experience_not_found(experience_id));
    }
    info!(user_id = %user.id, experience_id = %experience_id, "Experience removed");
    Ok(())
}

/// GET /me
pub async fn handle_get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// PUT /me
pub async fn handle_update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<User>, AppError> {
    Ok(Json(update_profile(state.store.as_ref(), &user, update).await?))
}

/// POST /me/experience
pub async fn handle_add_experience(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<ExperienceInput>,
) -> Result<(StatusCode, Json<Experience>), AppError> {
    let entry = add_experience(state.store.as_ref(), &user, input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /me/experience/:id
pub async fn handle_update_experience(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(experience_id): Path<String>,
    ApiJson(update): ApiJson<ExperienceUpdate>,
) -> Result<Json<Experience>, AppError> {
    let experience_id = parse_id(&experience_id, "experience")?;
    let entry = update_experience(state.store.as_ref(), &user, experience_id, update).await?;
    Ok(Json(entry))
}

/// DELETE /me/experience/:id
pub async fn handle_delete_experience(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(experience_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let experience_id = parse_id(&experience_id, "experience")?;
    delete_experience(state.store.as_ref(), &user, experience_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
