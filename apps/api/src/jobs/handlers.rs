//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::auth::{authorize, CurrentUser};
use crate::errors::AppError;
use crate::extract::{parse_id, ApiJson, ApiQuery};
use crate::jobs::lifecycle::{self, CreateJobRequest, UpdateJobRequest};
use crate::jobs::search::{JobListParams, JobQuery};
use crate::models::job::Job;
use crate::models::user::Role;
use crate::state::AppState;

/// GET /jobs
pub async fn handle_list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<JobListParams>,
) -> Result<Json<Vec<Job>>, AppError> {
    let query = JobQuery::try_from(params)?;
    Ok(Json(state.store.list_jobs(&query, Utc::now()).await?))
}

/// GET /jobs/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, AppError> {
    let job_id = parse_id(&job_id, "job")?;
    state
        .store
        .find_job(job_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// POST /jobs
pub async fn handle_create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = lifecycle::create_job(state.store.as_ref(), &user, request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// PUT /jobs/:id
pub async fn handle_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<String>,
    ApiJson(request): ApiJson<UpdateJobRequest>,
) -> Result<Json<Job>, AppError> {
    let job_id = parse_id(&job_id, "job")?;
    let job = lifecycle::update_job(state.store.as_ref(), &user, job_id, request).await?;
    Ok(Json(job))
}

/// DELETE /jobs/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let job_id = parse_id(&job_id, "job")?;
    lifecycle::delete_job(state.store.as_ref(), &user, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /coord/jobs
pub async fn handle_list_own(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Job>>, AppError> {
    authorize(&user, Role::Coordinator)?;
    Ok(Json(state.store.jobs_created_by(user.id).await?))
}
