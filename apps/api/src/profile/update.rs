//! Typed update requests for the profile surface.
//!
//! Only the fields declared here can change. Serde drops unknown keys, so a
//! body carrying `role`, `email` or `password_hash` is accepted and those
//! keys do nothing. An absent field leaves the stored value as is; `null`
//! clears a nullable field. The non-nullable ones (`name`, `skills`, `links`,
//! and an entry's `type`, `title`, `is_current` and lists) treat `null` as
//! absent.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::present;
use crate::models::user::{Experience, ExperienceKind, FullName};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<FullName>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub dob: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub branch: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub ug_percentage: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub ug_cgpa: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub ug_yop: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub tenth_percentage: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub tenth_yop: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub twelfth_percentage: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub twelfth_yop: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub diploma_percentage: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub diploma_yop: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub has_internship: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present")]
    pub standing_backlogs: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present")]
    pub resume_url: Option<Option<String>>,
    pub skills: Option<Vec<String>>,
    pub links: Option<BTreeMap<String, String>>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            if name.first.trim().is_empty() {
                return Err(AppError::Validation("name.first cannot be empty".to_string()));
            }
        }
        let scores = [
            ("ug_percentage", self.ug_percentage.flatten()),
            ("ug_cgpa", self.ug_cgpa.flatten()),
            ("tenth_percentage", self.tenth_percentage.flatten()),
            ("twelfth_percentage", self.twelfth_percentage.flatten()),
            ("diploma_percentage", self.diploma_percentage.flatten()),
        ];
        for (field, value) in scores {
            if matches!(value, Some(v) if !v.is_finite() || v < 0.0) {
                return Err(AppError::Validation(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn apply_to(
        &self,
        user: &mut crate::models::user::User,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &self.$field {
                    user.$field = value.clone();
                })*
            };
        }
        set!(
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
        );
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(skills) = &self.skills {
            user.skills = skills.clone();
        }
        if let Some(links) = &self.links {
            user.links.0 = links.clone();
        }
        user.updated_at = now;
    }
}

/// Body of `POST /me/experience`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperienceInput {
    #[serde(rename = "type")]
    pub kind: ExperienceKind,
    pub company: Option<String>,
    pub title: String,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    pub summary: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    pub proof: Option<String>,
}

impl ExperienceInput {
    /// Validates and assigns a fresh stable id.
    pub fn into_experience(self) -> Result<Experience, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        check_date_order(self.start_date, self.end_date)?;
        Ok(Experience {
            id: Uuid::new_v4(),
            kind: self.kind,
            company: self.company,
            title: self.title,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            is_current: self.is_current,
            summary: self.summary,
            technologies: self.technologies,
            achievements: self.achievements,
            links: self.links,
            proof: self.proof,
        })
    }
}

/// Body of `PUT /me/experience/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExperienceUpdate {
    #[serde(rename = "type")]
    pub kind: Option<ExperienceKind>,
    #[serde(default, deserialize_with = "present")]
    pub company: Option<Option<String>>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub end_date: Option<Option<NaiveDate>>,
    pub is_current: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub summary: Option<Option<String>>,
    pub technologies: Option<Vec<String>>,
    pub achievements: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    pub proof: Option<Option<String>>,
}

impl ExperienceUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        check_date_order(self.start_date.flatten(), self.end_date.flatten())
    }

    pub fn apply_to(&self, entry: &mut Experience) {
        if let Some(kind) = self.kind {
            entry.kind = kind;
        }
        if let Some(title) = &self.title {
            entry.title = title.clone();
        }
        if let Some(is_current) = self.is_current {
            entry.is_current = is_current;
        }
        macro_rules! set_opt {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &self.$field {
                    entry.$field = value.clone();
                })*
            };
        }
        set_opt!(company, location, start_date, end_date, summary, proof);
        macro_rules! set_vec {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &self.$field {
                    entry.$field = value.clone();
                })*
            };
        }
        set_vec!(technologies, achievements, links);
    }
}

pub fn check_date_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), AppError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(AppError::Validation(
            "end_date cannot be before start_date".to_string(),
        )),
        _ => Ok(()),
    }
}
