//! Postgres-backed `Store`. Every call is bounded by the configured store
//! timeout; uniqueness rules live in the schema and surface as
//! `StoreError::Duplicate`.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    ApplicationRepository, JobRepository, StoreError, UserRepository, SINGLE_COORDINATOR,
};
use crate::jobs::search::{like_pattern, JobQuery};
use crate::models::application::{Application, CandidateApplication};
use crate::models::job::{Job, JobSummary};
use crate::models::user::{Experience, Role, User};
use crate::profile::update::{ExperienceUpdate, ProfileUpdate};

/// Serializes coordinator registrations across connections.
const COORDINATOR_LOCK_KEY: i64 = 0x706c_6163_6f6f_7264;

macro_rules! experience_columns {
    () => {
        "id, kind, company, title, location, start_date, end_date, is_current, \
         summary, technologies, achievements, links, proof"
    };
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, E, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, E>>,
        StoreError: From<E>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    async fn experiences_of(&self, user_id: Uuid) -> Result<Vec<Experience>, sqlx::Error> {
        sqlx::query_as::<_, Experience>(concat!(
            "SELECT ",
            experience_columns!(),
            " FROM experiences WHERE user_id = $1 ORDER BY seq"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn with_experience(&self, user: Option<User>) -> Result<Option<User>, sqlx::Error> {
        match user {
            Some(mut user) => {
                user.experience = self.experiences_of(user.id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;
            if user.role == Role::Coordinator {
                sqlx::query("SELECT pg_advisory_xact_lock($1)")
                    .bind(COORDINATOR_LOCK_KEY)
                    .execute(&mut *tx)
                    .await?;
                let existing: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'coordinator'")
                        .fetch_one(&mut *tx)
                        .await?;
                if existing > 0 {
                    return Err(StoreError::duplicate(SINGLE_COORDINATOR));
                }
            }
            sqlx::query(
                r#"
                INSERT INTO users
                    (id, email, password_hash, role, first_name, last_name,
                     skills, links, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.name.first)
            .bind(&user.name.last)
            .bind(&user.skills)
            .bind(&user.links)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.bounded(async {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            self.with_experience(user).await
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.bounded(async {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
            self.with_experience(user).await
        })
        .await
    }

    async fn count_users_with_role(&self, role: Role) -> Result<i64, StoreError> {
        self.bounded(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
                .bind(role)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        self.bounded(async {
            let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = ");
            qb.push_bind(now);
            macro_rules! assign {
                ($($field:ident),* $(,)?) => {
                    $(if let Some(value) = &update.$field {
                        qb.push(concat!(", ", stringify!($field), " = "))
                            .push_bind(value.clone());
                    })*
                };
            }
            assign!(
                phone,
                gender,
                dob,
                branch,
                ug_percentage,
                ug_cgpa,
                ug_yop,
                tenth_percentage,
                tenth_yop,
                twelfth_percentage,
                twelfth_yop,
                diploma_percentage,
                diploma_yop,
                has_internship,
                standing_backlogs,
                resume_url,
                skills,
            );
            if let Some(name) = &update.name {
                qb.push(", first_name = ")
                    .push_bind(name.first.clone())
                    .push(", last_name = ")
                    .push_bind(name.last.clone());
            }
            if let Some(links) = &update.links {
                qb.push(", links = ").push_bind(Json(links.clone()));
            }
            qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
            let user = qb.build_query_as::<User>().fetch_optional(&self.pool).await?;
            self.with_experience(user).await
        })
        .await
    }

    async fn add_experience(&self, user_id: Uuid, entry: &Experience) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO experiences
                    (id, user_id, kind, company, title, location, start_date, end_date,
                     is_current, summary, technologies, achievements, links, proof)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(entry.id)
            .bind(user_id)
            .bind(entry.kind)
            .bind(&entry.company)
            .bind(&entry.title)
            .bind(&entry.location)
            .bind(entry.start_date)
            .bind(entry.end_date)
            .bind(entry.is_current)
            .bind(&entry.summary)
            .bind(&entry.technologies)
            .bind(&entry.achievements)
            .bind(&entry.links)
            .bind(&entry.proof)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn update_experience(
        &self,
        user_id: Uuid,
        experience_id: Uuid,
        update: &ExperienceUpdate,
    ) -> Result<Option<Experience>, StoreError> {
        self.bounded(async {
            let mut qb = QueryBuilder::<Postgres>::new("UPDATE experiences SET id = id");
            if let Some(kind) = update.kind {
                qb.push(", kind = ").push_bind(kind);
            }
            macro_rules! assign {
                ($($field:ident),* $(,)?) => {
                    $(if let Some(value) = &update.$field {
                        qb.push(concat!(", ", stringify!($field), " = "))
                            .push_bind(value.clone());
                    })*
                };
            }
            assign!(
                company,
                title,
                location,
                start_date,
                end_date,
                is_current,
                summary,
                technologies,
                achievements,
                links,
                proof,
            );
            qb.push(" WHERE id = ")
                .push_bind(experience_id)
                .push(" AND user_id = ")
                .push_bind(user_id)
                .push(concat!(" RETURNING ", experience_columns!()));
            qb.build_query_as::<Experience>()
                .fetch_optional(&self.pool)
                .await
        })
        .await
    }

    async fn delete_experience(
        &self,
        user_id: Uuid,
        experience_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = self
            .bounded(
                sqlx::query("DELETE FROM experiences WHERE id = $1 AND user_id = $2")
                    .bind(experience_id)
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl JobRepository for PgStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO jobs
                    (id, title, company, employment_type, location, ctc, stipend,
                     tech_stack, deadline, eligibility, description, created_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(job.id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.employment_type)
            .bind(&job.location)
            .bind(job.ctc)
            .bind(job.stipend)
            .bind(&job.tech_stack)
            .bind(job.deadline)
            .bind(&job.eligibility)
            .bind(&job.description)
            .bind(job.created_by)
            .bind(job.created_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn replace_job(&self, job: &Job) -> Result<bool, StoreError> {
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    UPDATE jobs SET
                        title = $2, company = $3, employment_type = $4, location = $5,
                        ctc = $6, stipend = $7, tech_stack = $8, deadline = $9,
                        eligibility = $10, description = $11
                    WHERE id = $1
                    "#,
                )
                .bind(job.id)
                .bind(&job.title)
                .bind(&job.company)
                .bind(&job.employment_type)
                .bind(&job.location)
                .bind(job.ctc)
                .bind(job.stipend)
                .bind(&job.tech_stack)
                .bind(job.deadline)
                .bind(&job.eligibility)
                .bind(&job.description)
                .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_job(&self, id: Uuid) -> Result<u64, StoreError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;
            let removed = sqlx::query("DELETE FROM applications WHERE job_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            sqlx::query("DELETE FROM jobs WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, sqlx::Error>(removed)
        })
        .await
    }

    async fn list_jobs(
        &self,
        query: &JobQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, StoreError> {
        self.bounded(async {
            let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM jobs WHERE TRUE");
            if let Some(text) = &query.text {
                let pattern = like_pattern(text);
                qb.push(" AND (title ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR company ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR EXISTS (SELECT 1 FROM unnest(tech_stack) AS t WHERE t ILIKE ")
                    .push_bind(pattern)
                    .push(" ESCAPE '\\'))");
            }
            if let Some(tech) = &query.tech {
                qb.push(" AND ")
                    .push_bind(tech.clone())
                    .push(" = ANY(tech_stack)");
            }
            if let Some(location) = &query.location {
                qb.push(" AND location ILIKE ")
                    .push_bind(like_pattern(location))
                    .push(" ESCAPE '\\'");
            }
            if query.upcoming_only {
                qb.push(" AND deadline >= ").push_bind(now);
            }
            let direction = if query.sort.is_ascending() { "ASC" } else { "DESC" };
            qb.push(format!(
                " ORDER BY {} {direction} NULLS LAST, created_at DESC",
                query.sort.column()
            ));
            qb.build_query_as::<Job>().fetch_all(&self.pool).await
        })
        .await
    }

    async fn jobs_created_by(&self, user_id: Uuid) -> Result<Vec<Job>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, Job>(
                "SELECT * FROM jobs WHERE created_by = $1 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await
    }
}

#[async_trait]
impl ApplicationRepository for PgStore {
    async fn application_exists(&self, user_id: Uuid, job_id: Uuid) -> Result<bool, StoreError> {
        self.bounded(
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM applications WHERE user_id = $1 AND job_id = $2)",
            )
            .bind(user_id)
            .bind(job_id)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn insert_application(&self, application: &Application) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO applications
                    (id, user_id, job_id, status, notes, profile_snapshot, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(application.id)
            .bind(application.user_id)
            .bind(application.job_id)
            .bind(&application.status)
            .bind(&application.notes)
            .bind(&application.profile_snapshot)
            .bind(application.created_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn applications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CandidateApplication>, StoreError> {
        self.bounded(async {
            let applications = sqlx::query_as::<_, Application>(
                "SELECT * FROM applications WHERE user_id = $1 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

            let job_ids: Vec<Uuid> = applications.iter().map(|a| a.job_id).collect();
            let jobs: HashMap<Uuid, JobSummary> =
                sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ANY($1)")
                    .bind(&job_ids)
                    .fetch_all(&self.pool)
                    .await?
                    .iter()
                    .map(|job| (job.id, JobSummary::from(job)))
                    .collect();

            Ok::<_, sqlx::Error>(
                applications
                    .into_iter()
                    .map(|application| CandidateApplication {
                        job: jobs.get(&application.job_id).cloned(),
                        application,
                    })
                    .collect(),
            )
        })
        .await
    }

    async fn applications_for_job(&self, job_id: Uuid) -> Result<Vec<Application>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, Application>(
                "SELECT * FROM applications WHERE job_id = $1 ORDER BY created_at ASC",
            )
            .bind(job_id)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: &str,
        notes: Option<Option<String>>,
    ) -> Result<Option<Application>, StoreError> {
        let replace_notes = notes.is_some();
        self.bounded(
            sqlx::query_as::<_, Application>(
                r#"
                UPDATE applications
                SET status = $2,
                    notes = CASE WHEN $3 THEN $4 ELSE notes END
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(status)
            .bind(replace_notes)
            .bind(notes.flatten())
            .fetch_optional(&self.pool),
        )
        .await
    }
}
