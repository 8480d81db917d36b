use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::job::JobSummary;
use crate::models::user::{Experience, FullName, User};

/// Status every application starts in. Coordinators may move it to any other label.
pub const STATUS_APPLIED: &str = "Applied";

/// Candidate profile frozen at submission time. Never rewritten afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSnapshot {
    pub name: FullName,
    pub email: String,
    pub phone: Option<String>,
    pub branch: Option<String>,
    pub ug_percentage: Option<f64>,
    pub ug_cgpa: Option<f64>,
    pub skills: Vec<String>,
    pub resume_url: Option<String>,
    pub links: BTreeMap<String, String>,
    pub top_experience: Option<Experience>,
}

impl ProfileSnapshot {
    pub fn capture(user: &User) -> Self {
        ProfileSnapshot {
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            branch: user.branch.clone(),
            ug_percentage: user.ug_percentage,
            ug_cgpa: user.ug_cgpa,
            skills: user.skills.clone(),
            resume_url: user.resume_url.clone(),
            links: user.links.0.clone(),
            top_experience: user.latest_experience().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub status: String,
    pub notes: Option<String>,
    pub profile_snapshot: Json<ProfileSnapshot>,
    pub created_at: DateTime<Utc>,
}

/// An application as listed for its candidate, with the job it targets.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateApplication {
    #[serde(flatten)]
    pub application: Application,
    pub job: Option<JobSummary>,
}
