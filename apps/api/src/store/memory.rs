//! In-process store used by unit and router tests. Enforces the same
//! uniqueness rules as the Postgres schema.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use super::{
    ApplicationRepository, JobRepository, StoreError, UserRepository, APPLICATION_UNIQUE,
    EMAIL_UNIQUE, SINGLE_COORDINATOR,
};
use crate::jobs::search::JobQuery;
use crate::models::application::{Application, CandidateApplication};
use crate::models::job::{Job, JobSummary};
use crate::models::user::{Experience, Role, User};
use crate::profile::update::{ExperienceUpdate, ProfileUpdate};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    jobs: HashMap<Uuid, Job>,
    applications: Vec<Application>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    injected: Mutex<Option<StoreError>>,
}

impl MemoryStore {
    /// Makes the next `insert_*` call fail with `err` without touching state.
    pub fn fail_next_insert(&self, err: StoreError) {
        *self.injected.lock() = Some(err);
    }

    fn take_injected(&self) -> Result<(), StoreError> {
        match self.injected.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&self.tables.read())
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        f(&mut self.tables.write())
    }

    pub fn find_application(&self, id: Uuid) -> Option<Application> {
        self.read(|t| t.applications.iter().find(|a| a.id == id).cloned())
    }

    pub fn count_applications_for_job(&self, job_id: Uuid) -> usize {
        self.read(|t| t.applications.iter().filter(|a| a.job_id == job_id).count())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.take_injected()?;
        self.with(|t| {
            if t.users.values().any(|u| u.email == user.email) {
                return Err(StoreError::duplicate(EMAIL_UNIQUE));
            }
            if user.role == Role::Coordinator
                && t.users.values().any(|u| u.role == Role::Coordinator)
            {
                return Err(StoreError::duplicate(SINGLE_COORDINATOR));
            }
            t.users.insert(user.id, user.clone());
            Ok(())
        })
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.read(|t| t.users.get(&id).cloned()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read(|t| t.users.values().find(|u| u.email == email).cloned()))
    }

    async fn count_users_with_role(&self, role: Role) -> Result<i64, StoreError> {
        Ok(self.read(|t| t.users.values().filter(|u| u.role == role).count() as i64))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        Ok(self.with(|t| {
            t.users.get_mut(&id).map(|user| {
                update.apply_to(user, now);
                user.clone()
            })
        }))
    }

    async fn add_experience(&self, user_id: Uuid, entry: &Experience) -> Result<(), StoreError> {
        self.with(|t| {
            if let Some(user) = t.users.get_mut(&user_id) {
                user.experience.push(entry.clone());
            }
        });
        Ok(())
    }

    async fn update_experience(
        &self,
        user_id: Uuid,
        experience_id: Uuid,
        update: &ExperienceUpdate,
    ) -> Result<Option<Experience>, StoreError> {
        Ok(self.with(|t| {
            let entry = t
                .users
                .get_mut(&user_id)?
                .experience
                .iter_mut()
                .find(|e| e.id == experience_id)?;
            update.apply_to(entry);
            Some(entry.clone())
        }))
    }

    async fn delete_experience(
        &self,
        user_id: Uuid,
        experience_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self.with(|t| match t.users.get_mut(&user_id) {
            Some(user) => {
                let before = user.experience.len();
                user.experience.retain(|e| e.id != experience_id);
                user.experience.len() != before
            }
            None => false,
        }))
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        self.take_injected()?;
        self.with(|t| {
            t.jobs.insert(job.id, job.clone());
        });
        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.read(|t| t.jobs.get(&id).cloned()))
    }

    async fn replace_job(&self, job: &Job) -> Result<bool, StoreError> {
        Ok(self.with(|t| match t.jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                true
            }
            None => false,
        }))
    }

    async fn delete_job(&self, id: Uuid) -> Result<u64, StoreError> {
        Ok(self.with(|t| {
            let before = t.applications.len();
            t.applications.retain(|a| a.job_id != id);
            t.jobs.remove(&id);
            (before - t.applications.len()) as u64
        }))
    }

    async fn list_jobs(
        &self,
        query: &JobQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.read(|t| {
            t.jobs
                .values()
                .filter(|job| query.matches(job, now))
                .cloned()
                .collect()
        });
        query.sort(&mut jobs);
        Ok(jobs)
    }

    async fn jobs_created_by(&self, user_id: Uuid) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.read(|t| {
            t.jobs
                .values()
                .filter(|job| job.is_owned_by(user_id))
                .cloned()
                .collect()
        });
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}

#[async_trait]
impl ApplicationRepository for MemoryStore {
    async fn application_exists(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.read(|t| {
            t.applications
                .iter()
                .any(|a| a.user_id == user_id && a.job_id == job_id)
        }))
    }

    async fn insert_application(&self, application: &Application) -> Result<(), StoreError> {
        self.take_injected()?;
        self.with(|t| {
            let taken = t
                .applications
                .iter()
                .any(|a| a.user_id == application.user_id && a.job_id == application.job_id);
            if taken {
                return Err(StoreError::duplicate(APPLICATION_UNIQUE));
            }
            t.applications.push(application.clone());
            Ok(())
        })
    }

    async fn applications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CandidateApplication>, StoreError> {
        Ok(self.read(|t| {
            let mut listed: Vec<CandidateApplication> = t
                .applications
                .iter()
                .filter(|a| a.user_id == user_id)
                .map(|a| CandidateApplication {
                    application: a.clone(),
                    job: t.jobs.get(&a.job_id).map(JobSummary::from),
                })
                .collect();
            // Latest insert first on equal timestamps.
            listed.reverse();
            listed.sort_by(|a, b| b.application.created_at.cmp(&a.application.created_at));
            listed
        }))
    }

    async fn applications_for_job(&self, job_id: Uuid) -> Result<Vec<Application>, StoreError> {
        Ok(self.read(|t| {
            let mut listed: Vec<Application> = t
                .applications
                .iter()
                .filter(|a| a.job_id == job_id)
                .cloned()
                .collect();
            listed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            listed
        }))
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: &str,
        notes: Option<Option<String>>,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self.with(|t| {
            let application = t.applications.iter_mut().find(|a| a.id == id)?;
            application.status = status.to_string();
            if let Some(notes) = notes {
                application.notes = notes;
            }
            Some(application.clone())
        }))
    }
}
