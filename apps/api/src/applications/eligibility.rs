//! Application submission: eligibility rules, deadline and duplicate control.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. job exists                      → `NotFound`
//! 2. `now <= deadline`               → `DeadlinePassed`
//! 3. candidate has a resume          → `ResumeRequired`
//! 4. min CGPA, min percentage, branch → `Ineligible`
//! 5. no prior application for the pair → `Duplicate`
//!
//! Step 5 is repeated by the store's unique index; an insert that loses the
//! race surfaces as `Duplicate` too.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{Application, ProfileSnapshot, STATUS_APPLIED};
use crate::models::job::{EligibilityRules, Job};
use crate::models::user::User;
use crate::store::{ApplicationRepository, JobRepository, APPLICATION_UNIQUE};

/// Evaluates the job's rule set against the candidate. A missing score on
/// the candidate compares as 0; an absent or empty rule passes.
pub fn check_rules(rules: &EligibilityRules, user: &User) -> Result<(), AppError> {
    if let Some(min_cgpa) = rules.min_cgpa {
        if user.ug_cgpa.unwrap_or(0.0) < min_cgpa {
            return Err(AppError::Ineligible(
                "Does not meet minimum CGPA requirement".to_string(),
            ));
        }
    }
    if let Some(min_percentage) = rules.min_percentage {
        if user.ug_percentage.unwrap_or(0.0) < min_percentage {
            return Err(AppError::Ineligible(
                "Does not meet minimum percentage requirement".to_string(),
            ));
        }
    }
    if let Some(branches) = rules.branches.as_ref().filter(|b| !b.is_empty()) {
        let eligible = user
            .branch
            .as_deref()
            .map(|branch| branches.iter().any(|b| b == branch))
            .unwrap_or(false);
        if !eligible {
            return Err(AppError::Ineligible(
                "Branch not eligible for this position".to_string(),
            ));
        }
    }
    Ok(())
}

/// Steps 2 to 4: everything decidable from the job and the candidate alone.
pub fn check_eligibility(job: &Job, user: &User, now: DateTime<Utc>) -> Result<(), AppError> {
    if now > job.deadline {
        return Err(AppError::DeadlinePassed);
    }
    if !user.has_resume() {
        return Err(AppError::ResumeRequired);
    }
    check_rules(&job.eligibility, user)
}

pub async fn submit_application<S>(
    store: &S,
    user: &User,
    job_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Application, AppError>
where
    S: JobRepository + ApplicationRepository + ?Sized,
{
    let job = store
        .find_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    if let Err(err) = check_eligibility(&job, user, now) {
        warn!(user_id = %user.id, job_id = %job.id, code = err.code(), "Application rejected");
        return Err(err);
    }

    if store.application_exists(user.id, job.id).await? {
        return Err(AppError::Duplicate);
    }

    let application = Application {
        id: Uuid::new_v4(),
        user_id: user.id,
        job_id: job.id,
        status: STATUS_APPLIED.to_string(),
        notes: None,
        profile_snapshot: Json(ProfileSnapshot::capture(user)),
        created_at: now,
    };

    store
        .insert_application(&application)
        .await
        .map_err(|err| {
            if err.is_duplicate_of(APPLICATION_UNIQUE) {
                AppError::Duplicate
            } else {
                AppError::from(err)
            }
        })?;

    info!(
        application_id = %application.id,
        user_id = %user.id,
        job_id = %job.id,
        "Application submitted"
    );
    Ok(application)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    use crate::models::user::ExperienceKind;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreError;
    use crate::testing::{coordinator, experience, job_for, student};

    fn rules(
        min_cgpa: Option<f64>,
        min_percentage: Option<f64>,
        branches: &[&str],
    ) -> EligibilityRules {
        EligibilityRules {
            min_cgpa,
            min_percentage,
            branches: if branches.is_empty() {
                None
            } else {
                Some(branches.iter().map(|b| b.to_string()).collect())
            },
            backlogs_allowed: None,
        }
    }

    async fn seeded(deadline: DateTime<Utc>) -> (MemoryStore, Job) {
        let store = MemoryStore::default();
        let job = job_for(&coordinator(), deadline);
        store.insert_job(&job).await.unwrap();
        (store, job)
    }

    #[test]
    fn test_cgpa_boundary() {
        let r = rules(Some(7.5), None, &[]);
        let mut user = student();
        user.ug_cgpa = Some(7.49);
        assert!(matches!(check_rules(&r, &user), Err(AppError::Ineligible(_))));
        user.ug_cgpa = Some(7.5);
        assert!(check_rules(&r, &user).is_ok());
    }

    #[test]
    fn test_missing_scores_compare_as_zero() {
        let mut user = student();
        user.ug_cgpa = None;
        user.ug_percentage = None;
        assert!(check_rules(&rules(Some(0.0), Some(0.0), &[]), &user).is_ok());
        assert!(check_rules(&rules(Some(0.1), None, &[]), &user).is_err());
        assert!(check_rules(&rules(None, Some(60.0), &[]), &user).is_err());
    }

    #[test]
    fn test_branch_membership() {
        let r = rules(None, None, &["CSE", "AIML"]);
        let mut user = student();
        user.branch = Some("ECE".to_string());
        assert!(matches!(check_rules(&r, &user), Err(AppError::Ineligible(_))));
        user.branch = None;
        assert!(check_rules(&r, &user).is_err());
        user.branch = Some("AIML".to_string());
        assert!(check_rules(&r, &user).is_ok());
    }

    #[test]
    fn test_empty_rule_set_admits_everyone() {
        let mut user = student();
        user.ug_cgpa = None;
        user.branch = None;
        let r = EligibilityRules {
            branches: Some(vec![]),
            backlogs_allowed: Some(false),
            ..EligibilityRules::default()
        };
        assert!(check_rules(&r, &user).is_ok());
    }

    #[test]
    fn test_backlogs_flag_is_not_enforced() {
        let mut user = student();
        user.standing_backlogs = Some(true);
        let r = EligibilityRules {
            backlogs_allowed: Some(false),
            ..EligibilityRules::default()
        };
        assert!(check_rules(&r, &user).is_ok());
    }

    #[test]
    fn test_deadline_equality_still_eligible() {
        let now = Utc::now();
        let job = job_for(&coordinator(), now);
        assert!(check_eligibility(&job, &student(), now).is_ok());
        assert!(matches!(
            check_eligibility(&job, &student(), now + Duration::milliseconds(1)),
            Err(AppError::DeadlinePassed)
        ));
    }

    #[test]
    fn test_deadline_checked_before_resume_and_rules() {
        let now = Utc::now();
        let job = job_for(&coordinator(), now - Duration::hours(1));
        let mut user = student();
        user.resume_url = None;
        user.branch = Some("ECE".to_string());
        assert!(matches!(
            check_eligibility(&job, &user, now),
            Err(AppError::DeadlinePassed)
        ));
    }

    #[test]
    fn test_resume_checked_before_rules() {
        let now = Utc::now();
        let job = job_for(&coordinator(), now + Duration::days(1));
        let mut user = student();
        user.resume_url = None;
        user.ug_cgpa = Some(1.0);
        user.branch = Some("ECE".to_string());
        assert!(matches!(
            check_eligibility(&job, &user, now),
            Err(AppError::ResumeRequired)
        ));
    }

    #[tokio::test]
    async fn test_eligible_candidate_is_admitted() {
        let now = Utc::now();
        let (store, job) = seeded(now + Duration::days(5)).await;
        let user = student();
        let app = submit_application(&store, &user, job.id, now).await.unwrap();
        assert_eq!(app.status, STATUS_APPLIED);
        assert!(app.notes.is_none());
        assert_eq!(app.created_at, now);
        assert_eq!(app.profile_snapshot.ug_cgpa, Some(8.2));
    }

    #[tokio::test]
    async fn test_other_branch_ineligible() {
        let now = Utc::now();
        let (store, job) = seeded(now + Duration::days(5)).await;
        let mut user = student();
        user.branch = Some("ECE".to_string());
        let err = submit_application(&store, &user, job.id, now).await.unwrap_err();
        assert_eq!(err.code(), "ERR_INELIGIBLE");
    }

    #[tokio::test]
    async fn test_expired_job_rejects_any_candidate() {
        let now = Utc::now();
        let (store, job) = seeded(now - Duration::hours(1)).await;
        let err = submit_application(&store, &student(), job.id, now).await.unwrap_err();
        assert_eq!(err.code(), "ERR_DEADLINE");
        assert_eq!(store.count_applications_for_job(job.id), 0);
    }

    #[tokio::test]
    async fn test_unknown_job_not_found() {
        let store = MemoryStore::default();
        let err = submit_application(&store, &student(), Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_second_submission_is_duplicate() {
        let now = Utc::now();
        let (store, job) = seeded(now + Duration::days(5)).await;
        let user = student();
        submit_application(&store, &user, job.id, now).await.unwrap();
        let err = submit_application(&store, &user, job.id, now).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate));
        assert_eq!(store.count_applications_for_job(job.id), 1);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_leave_one_application() {
        let now = Utc::now();
        let (store, job) = seeded(now + Duration::days(5)).await;
        let store = Arc::new(store);
        let user = student();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let user = user.clone();
            handles.push(tokio::spawn(async move {
                submit_application(store.as_ref(), &user, job.id, now).await
            }));
        }
        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(err) => assert!(matches!(err, AppError::Duplicate)),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.count_applications_for_job(job.id), 1);
    }

    #[tokio::test]
    async fn test_lost_insert_race_maps_to_duplicate() {
        let now = Utc::now();
        let (store, job) = seeded(now + Duration::days(5)).await;
        let user = student();
        store.fail_next_insert(StoreError::duplicate(APPLICATION_UNIQUE));
        let err = submit_application(&store, &user, job.id, now).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate));
    }

    #[tokio::test]
    async fn test_snapshot_takes_latest_experience_and_stays_frozen() {
        let now = Utc::now();
        let (store, job) = seeded(now + Duration::days(5)).await;
        let mut user = student();
        user.experience = vec![
            experience(ExperienceKind::Internship, "Software Intern"),
            experience(ExperienceKind::Project, "Compiler"),
        ];
        let app = submit_application(&store, &user, job.id, now).await.unwrap();
        assert_eq!(
            app.profile_snapshot.top_experience.as_ref().map(|e| e.title.as_str()),
            Some("Compiler")
        );

        user.ug_cgpa = Some(9.9);
        user.skills.push("Kubernetes".to_string());
        let stored = store.find_application(app.id).unwrap();
        assert_eq!(stored.profile_snapshot.ug_cgpa, Some(8.2));
        assert!(!stored.profile_snapshot.skills.contains(&"Kubernetes".to_string()));
    }

    #[tokio::test]
    async fn test_snapshot_without_experience() {
        let now = Utc::now();
        let (store, job) = seeded(now + Duration::days(5)).await;
        let app = submit_application(&store, &student(), job.id, now).await.unwrap();
        assert!(app.profile_snapshot.top_experience.is_none());
    }
}
