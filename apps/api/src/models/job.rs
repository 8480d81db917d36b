use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Per-job admission constraints. A `None` axis imposes no restriction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EligibilityRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cgpa: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,
    /// Stored and returned, never evaluated at submission time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlogs_allowed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    #[serde(rename = "type")]
    pub employment_type: String,
    pub location: String,
    pub ctc: Option<f64>,
    pub stipend: Option<f64>,
    pub tech_stack: Vec<String>,
    /// Absolute UTC instant.
    pub deadline: DateTime<Utc>,
    pub eligibility: Json<EligibilityRules>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }
}

/// Minimal job view attached to a student's application listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub title: String,
    pub company: String,
    pub deadline: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        JobSummary {
            title: job.title.clone(),
            company: job.company.clone(),
            deadline: job.deadline,
        }
    }
}
