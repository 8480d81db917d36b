use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Coordinator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Coordinator => "coordinator",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, FromRow)]
pub struct FullName {
    #[sqlx(rename = "first_name")]
    pub first: String,
    #[sqlx(rename = "last_name")]
    #[serde(default)]
    pub last: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "experience_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExperienceKind {
    #[serde(alias = "Internship")]
    Internship,
    #[serde(alias = "Job", alias = "Full-time", alias = "full-time")]
    Job,
    #[serde(alias = "Project")]
    Project,
}

/// One entry of a user's work history. Addressed by `id`, never by position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Experience {
    pub id: Uuid,
    #[sqlx(rename = "kind")]
    #[serde(rename = "type")]
    pub kind: ExperienceKind,
    pub company: Option<String>,
    pub title: String,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub summary: Option<String>,
    pub technologies: Vec<String>,
    pub achievements: Vec<String>,
    pub links: Vec<String>,
    pub proof: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    #[sqlx(flatten)]
    pub name: FullName,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub branch: Option<String>,
    pub ug_percentage: Option<f64>,
    pub ug_cgpa: Option<f64>,
    pub ug_yop: Option<i32>,
    pub tenth_percentage: Option<f64>,
    pub tenth_yop: Option<i32>,
    pub twelfth_percentage: Option<f64>,
    pub twelfth_yop: Option<i32>,
    pub diploma_percentage: Option<f64>,
    pub diploma_yop: Option<i32>,
    pub has_internship: Option<bool>,
    pub standing_backlogs: Option<bool>,
    pub resume_url: Option<String>,
    pub skills: Vec<String>,
    pub links: Json<BTreeMap<String, String>>,
    /// Oldest first; loaded separately from the `experiences` table.
    #[sqlx(skip)]
    #[serde(default)]
    pub experience: Vec<Experience>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A bare account as created at registration; profile fields start empty.
    pub fn new(
        email: String,
        password_hash: String,
        role: Role,
        name: FullName,
        now: DateTime<Utc>,
    ) -> Self {
        User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            role,
            name,
            phone: None,
            gender: None,
            dob: None,
            branch: None,
            ug_percentage: None,
            ug_cgpa: None,
            ug_yop: None,
            tenth_percentage: None,
            tenth_yop: None,
            twelfth_percentage: None,
            twelfth_yop: None,
            diploma_percentage: None,
            diploma_yop: None,
            has_internship: None,
            standing_backlogs: None,
            resume_url: None,
            skills: Vec::new(),
            links: Json(BTreeMap::new()),
            experience: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_resume(&self) -> bool {
        self.resume_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }

    /// The most recently added experience entry, if any.
    pub fn latest_experience(&self) -> Option<&Experience> {
        self.experience.last()
    }
}
