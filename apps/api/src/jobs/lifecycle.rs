use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use sqlx::types::Json;
use tracing::info;
use uuid::Uuid;

use crate::auth::{authorize, ensure_owner};
use crate::errors::AppError;
use crate::extract::present;
use crate::models::job::{EligibilityRules, Job};
use crate::models::user::{Role, User};
use crate::store::{ApplicationRepository, JobRepository};

/// Parses caller-supplied deadline text into an absolute UTC instant.
///
/// Accepts RFC 3339 (`2025-10-19T18:30:00+05:30`, `...Z`) and naive
/// `YYYY-MM-DDTHH:MM[:SS]` values, which are read as UTC.
pub fn parse_deadline(text: &str) -> Result<DateTime<Utc>, AppError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(AppError::Validation(format!(
        "deadline '{text}' is not an ISO-8601 timestamp"
    )))
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub company: String,
    #[serde(rename = "type")]
    pub employment_type: String,
    pub location: String,
    pub ctc: Option<f64>,
    pub stipend: Option<f64>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    pub deadline: String,
    #[serde(default)]
    pub eligibility: EligibilityRules,
    pub description: Option<String>,
}

/// Body of `PUT /jobs/{id}`. Every declared field is optional; anything
/// else in the body is dropped by serde. `null` clears `ctc`, `stipend`
/// and `description`, and means absent for the rest.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub company: Option<String>,
    #[serde(rename = "type")]
    pub employment_type: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub ctc: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub stipend: Option<Option<f64>>,
    pub tech_stack: Option<Vec<String>>,
    pub deadline: Option<String>,
    pub eligibility: Option<EligibilityRules>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn check_amount(field: &str, value: Option<f64>) -> Result<(), AppError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::Validation(format!(
            "{field} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

fn check_rules(rules: &EligibilityRules) -> Result<(), AppError> {
    check_amount("eligibility.min_cgpa", rules.min_cgpa)?;
    check_amount("eligibility.min_percentage", rules.min_percentage)
}

fn clean_stack(stack: Vec<String>) -> Vec<String> {
    stack
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

impl CreateJobRequest {
    pub fn into_job(self, creator: Uuid, now: DateTime<Utc>) -> Result<Job, AppError> {
        require_text("title", &self.title)?;
        require_text("company", &self.company)?;
        require_text("type", &self.employment_type)?;
        require_text("location", &self.location)?;
        check_amount("ctc", self.ctc)?;
        check_amount("stipend", self.stipend)?;
        check_rules(&self.eligibility)?;
        let deadline = parse_deadline(&self.deadline)?;

        Ok(Job {
            id: Uuid::new_v4(),
            title: self.title,
            company: self.company,
            employment_type: self.employment_type,
            location: self.location,
            ctc: self.ctc,
            stipend: self.stipend,
            tech_stack: clean_stack(self.tech_stack),
            deadline,
            eligibility: Json(self.eligibility),
            description: self.description,
            created_by: creator,
            created_at: now,
        })
    }
}

impl UpdateJobRequest {
    pub fn apply_to(self, job: &mut Job) -> Result<(), AppError> {
        if let Some(title) = self.title {
            require_text("title", &title)?;
            job.title = title;
        }
        if let Some(company) = self.company {
            require_text("company", &company)?;
            job.company = company;
        }
        if let Some(employment_type) = self.employment_type {
            require_text("type", &employment_type)?;
            job.employment_type = employment_type;
        }
        if let Some(location) = self.location {
            require_text("location", &location)?;
            job.location = location;
        }
        if let Some(ctc) = self.ctc {
            check_amount("ctc", ctc)?;
            job.ctc = ctc;
        }
        if let Some(stipend) = self.stipend {
            check_amount("stipend", stipend)?;
            job.stipend = stipend;
        }
        if let Some(stack) = self.tech_stack {
            job.tech_stack = clean_stack(stack);
        }
        if let Some(deadline) = self.deadline {
            job.deadline = parse_deadline(&deadline)?;
        }
        if let Some(rules) = self.eligibility {
            check_rules(&rules)?;
            job.eligibility = Json(rules);
        }
        if let Some(description) = self.description {
            job.description = description;
        }
        Ok(())
    }
}

/// Loads a job the caller is allowed to manage: coordinator role and creator.
async fn load_owned_job<S>(store: &S, user: &User, job_id: Uuid) -> Result<Job, AppError>
where
    S: JobRepository + ?Sized,
{
    authorize(user, Role::Coordinator)?;
    let job = store
        .find_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    ensure_owner(user, &job)?;
    Ok(job)
}

pub async fn create_job<S>(
    store: &S,
    user: &User,
    request: CreateJobRequest,
    now: DateTime<Utc>,
) -> Result<Job, AppError>
where
    S: JobRepository + ?Sized,
{
    authorize(user, Role::Coordinator)?;
    let job = request.into_job(user.id, now)?;
    store.insert_job(&job).await?;
    info!(job_id = %job.id, coordinator = %user.id, deadline = %job.deadline, "Job created");
    Ok(job)
}

pub async fn update_job<S>(
    store: &S,
    user: &User,
    job_id: Uuid,
    request: UpdateJobRequest,
) -> Result<Job, AppError>
where
    S: JobRepository + ?Sized,
{
    let mut job = load_owned_job(store, user, job_id).await?;
    request.apply_to(&mut job)?;
    if !store.replace_job(&job).await? {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    info!(job_id = %job.id, "Job updated");
    Ok(job)
}

/// Deletes the job and cascades to its applications. Returns how many
/// applications went with it.
pub async fn delete_job<S>(store: &S, user: &User, job_id: Uuid) -> Result<u64, AppError>
where
    S: JobRepository + ApplicationRepository + ?Sized,
{
    let job = load_owned_job(store, user, job_id).await?;
    let removed = store.delete_job(job.id).await?;
    info!(job_id = %job.id, applications_removed = removed, "Job deleted");
    Ok(removed)
}
