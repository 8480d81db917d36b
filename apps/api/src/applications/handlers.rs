//! Axum route handlers for the Applications API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::applications::eligibility::submit_application;
use crate::auth::{authorize, CurrentUser};
use crate::errors::AppError;
use crate::extract::{parse_id, present, ApiJson, ApiQuery};
use crate::models::application::{Application, CandidateApplication};
use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::store::ApplicationRepository;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    /// Absent: keep notes. Present (even `null`): replace them.
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

/// Whose applications `GET /applications` should list.
/// Anyone may list their own; only coordinators may list someone else's.
pub fn resolve_applicant(caller: &User, requested: Option<&str>) -> Result<Uuid, AppError> {
    let target = match requested.map(str::trim) {
        None | Some("") | Some("me") => return Ok(caller.id),
        Some(raw) => parse_id(raw, "user")?,
    };
    if target != caller.id && caller.role != Role::Coordinator {
        return Err(AppError::Forbidden(
            "Cannot view another user's applications".to_string(),
        ));
    }
    Ok(target)
}

pub async fn update_status<S>(
    store: &S,
    caller: &User,
    application_id: Uuid,
    request: StatusUpdateRequest,
) -> Result<Application, AppError>
where
    S: ApplicationRepository + ?Sized,
{
    authorize(caller, Role::Coordinator)?;
    let status = request.status.trim();
    if status.is_empty() {
        return Err(AppError::Validation("status cannot be empty".to_string()));
    }
    let updated = store
        .update_application_status(application_id, status, request.notes)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;
    info!(application_id = %updated.id, status = %updated.status, "Application status updated");
    Ok(updated)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /applications
pub async fn handle_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<SubmitApplicationRequest>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let job_id = parse_id(&request.job_id, "job")?;
    let application = submit_application(state.store.as_ref(), &user, job_id, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /applications?user_id=
pub async fn handle_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(params): ApiQuery<ApplicationsQuery>,
) -> Result<Json<Vec<CandidateApplication>>, AppError> {
    let applicant = resolve_applicant(&user, params.user_id.as_deref())?;
    Ok(Json(state.store.applications_for_user(applicant).await?))
}

/// GET /jobs/:id/applications
pub async fn handle_list_for_job(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<Application>>, AppError> {
    authorize(&user, Role::Coordinator)?;
    let job_id = parse_id(&job_id, "job")?;
    if state.store.find_job(job_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    Ok(Json(state.store.applications_for_job(job_id).await?))
}

/// PUT /applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(application_id): Path<String>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> Result<Json<Application>, AppError> {
    let application_id = parse_id(&application_id, "application")?;
    let updated = update_status(state.store.as_ref(), &user, application_id, request).await?;
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    use crate::store::memory::MemoryStore;
    use crate::store::JobRepository;
    use crate::testing::{coordinator, job_for, student, submit};

    #[test]
    fn test_notes_presence_is_distinguished() {
        let absent: StatusUpdateRequest =
            serde_json::from_value(json!({ "status": "Selected" })).unwrap();
        assert_eq!(absent.notes, None);
        let cleared: StatusUpdateRequest =
            serde_json::from_value(json!({ "status": "Selected", "notes": null })).unwrap();
        assert_eq!(cleared.notes, Some(None));
        let set: StatusUpdateRequest =
            serde_json::from_value(json!({ "status": "Selected", "notes": "Strong DSA" })).unwrap();
        assert_eq!(set.notes, Some(Some("Strong DSA".to_string())));
    }

    #[test]
    fn test_resolve_applicant() {
        let me = student();
        let other = student();
        assert_eq!(resolve_applicant(&me, None).unwrap(), me.id);
        assert_eq!(resolve_applicant(&me, Some("me")).unwrap(), me.id);
        assert_eq!(resolve_applicant(&me, Some(&me.id.to_string())).unwrap(), me.id);
        assert!(matches!(
            resolve_applicant(&me, Some(&other.id.to_string())),
            Err(AppError::Forbidden(_))
        ));
        let coord = coordinator();
        assert_eq!(
            resolve_applicant(&coord, Some(&other.id.to_string())).unwrap(),
            other.id
        );
    }

    #[tokio::test]
    async fn test_status_update_keeps_snapshot() {
        let store = MemoryStore::default();
        let coord = coordinator();
        let job = job_for(&coord, Utc::now() + Duration::days(3));
        store.insert_job(&job).await.unwrap();
        let app = submit(&store, &student(), job.id).await;

        let request: StatusUpdateRequest =
            serde_json::from_value(json!({ "status": "Under Review", "notes": "Call Monday" }))
                .unwrap();
        let updated = update_status(&store, &coord, app.id, request).await.unwrap();
        assert_eq!(updated.status, "Under Review");
        assert_eq!(updated.notes.as_deref(), Some("Call Monday"));
        assert_eq!(updated.profile_snapshot, app.profile_snapshot);

        let request: StatusUpdateRequest =
            serde_json::from_value(json!({ "status": "Selected" })).unwrap();
        let updated = update_status(&store, &coord, app.id, request).await.unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Call Monday"));
    }

    #[tokio::test]
    async fn test_status_update_requires_coordinator() {
        let store = MemoryStore::default();
        let request: StatusUpdateRequest =
            serde_json::from_value(json!({ "status": "Selected" })).unwrap();
        let err = update_status(&store, &student(), Uuid::new_v4(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_status_update_unknown_application() {
        let store = MemoryStore::default();
        let request: StatusUpdateRequest =
            serde_json::from_value(json!({ "status": "Selected" })).unwrap();
        let err = update_status(&store, &coordinator(), Uuid::new_v4(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
