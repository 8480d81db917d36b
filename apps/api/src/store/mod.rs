//! Storage seam. Handlers and services only see these traits; `AppState`
//! carries an `Arc<dyn Store>` backed by Postgres in production.
//!
//! Nothing here caches entities between calls: every read goes to the
//! backing store so deadline and duplicate checks see current state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::jobs::search::JobQuery;
use crate::models::application::{Application, CandidateApplication};
use crate::models::job::Job;
use crate::models::user::{Experience, Role, User};
use crate::profile::update::{ExperienceUpdate, ProfileUpdate};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

pub const EMAIL_UNIQUE: &str = "users_email_key";
pub const SINGLE_COORDINATOR: &str = "users_single_coordinator";
pub const APPLICATION_UNIQUE: &str = "applications_user_job_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint {constraint} violated")]
    Duplicate { constraint: String },

    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn duplicate(constraint: &str) -> Self {
        StoreError::Duplicate {
            constraint: constraint.to_string(),
        }
    }

    pub fn is_duplicate_of(&self, name: &str) -> bool {
        matches!(self, StoreError::Duplicate { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new account. Email uniqueness and the single-coordinator
    /// rule are enforced here and reported as `StoreError::Duplicate`.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Loads a user together with its experience entries.
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn count_users_with_role(&self, role: Role) -> Result<i64, StoreError>;

    /// Applies the declared fields atomically. `None` when the user is gone.
    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    async fn add_experience(&self, user_id: Uuid, entry: &Experience) -> Result<(), StoreError>;

    async fn update_experience(
        &self,
        user_id: Uuid,
        experience_id: Uuid,
        update: &ExperienceUpdate,
    ) -> Result<Option<Experience>, StoreError>;

    async fn delete_experience(
        &self,
        user_id: Uuid,
        experience_id: Uuid,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError>;

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Overwrites the mutable columns of an existing job.
    async fn replace_job(&self, job: &Job) -> Result<bool, StoreError>;

    /// Removes the job and every application pointing at it in one unit.
    /// Returns the number of applications removed.
    async fn delete_job(&self, id: Uuid) -> Result<u64, StoreError>;

    async fn list_jobs(&self, query: &JobQuery, now: DateTime<Utc>)
        -> Result<Vec<Job>, StoreError>;

    /// Newest first.
    async fn jobs_created_by(&self, user_id: Uuid) -> Result<Vec<Job>, StoreError>;
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn application_exists(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, StoreError>;

    /// Fails with `StoreError::Duplicate { constraint: APPLICATION_UNIQUE }`
    /// when the (user, job) pair already has an application.
    async fn insert_application(&self, application: &Application) -> Result<(), StoreError>;

    /// Newest first, each with a summary of its job.
    async fn applications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CandidateApplication>, StoreError>;

    /// Oldest first.
    async fn applications_for_job(&self, job_id: Uuid) -> Result<Vec<Application>, StoreError>;

    /// Sets the status and, when `notes` is `Some`, replaces the notes.
    async fn update_application_status(
        &self,
        id: Uuid,
        status: &str,
        notes: Option<Option<String>>,
    ) -> Result<Option<Application>, StoreError>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store: UserRepository + JobRepository + ApplicationRepository {}

impl<T> Store for T where T: UserRepository + JobRepository + ApplicationRepository {}
