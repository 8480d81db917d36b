//! Job listing filters. The Postgres store turns a `JobQuery` into SQL;
//! under test, `matches` and `sort` give the same semantics over plain values.

#[cfg(test)]
use std::cmp::Ordering;
use std::str::FromStr;

#[cfg(test)]
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;
#[cfg(test)]
use crate::models::job::Job;

/// Raw `GET /jobs` query string.
#[derive(Debug, Default, Deserialize)]
pub struct JobListParams {
    pub q: Option<String>,
    pub tech: Option<String>,
    pub location: Option<String>,
    pub before_deadline: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobSort {
    /// Soonest deadline first.
    #[default]
    Deadline,
    CreatedAt,
    Ctc,
    Stipend,
}

impl JobSort {
    pub fn column(&self) -> &'static str {
        match self {
            JobSort::Deadline => "deadline",
            JobSort::CreatedAt => "created_at",
            JobSort::Ctc => "ctc",
            JobSort::Stipend => "stipend",
        }
    }

    pub fn is_ascending(&self) -> bool {
        matches!(self, JobSort::Deadline)
    }
}

impl FromStr for JobSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deadline" => Ok(JobSort::Deadline),
            "created_at" => Ok(JobSort::CreatedAt),
            "ctc" => Ok(JobSort::Ctc),
            "stipend" => Ok(JobSort::Stipend),
            other => Err(AppError::Validation(format!(
                "unsupported sort key '{other}' (expected deadline, created_at, ctc or stipend)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobQuery {
    pub text: Option<String>,
    pub tech: Option<String>,
    pub location: Option<String>,
    /// Only jobs whose deadline is still ahead (inclusive of now).
    pub upcoming_only: bool,
    pub sort: JobSort,
}

impl TryFrom<JobListParams> for JobQuery {
    type Error = AppError;

    fn try_from(params: JobListParams) -> Result<Self, Self::Error> {
        let upcoming_only = match params.before_deadline.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(v) if v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "before_deadline must be true or false, got '{other}'"
                )))
            }
        };
        let sort = match params.sort.as_deref() {
            None | Some("") => JobSort::default(),
            Some(s) => s.parse()?,
        };
        Ok(JobQuery {
            text: non_blank(params.q),
            tech: non_blank(params.tech),
            location: non_blank(params.location),
            upcoming_only,
            sort,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
impl JobQuery {
    pub fn matches(&self, job: &Job, now: DateTime<Utc>) -> bool {
        if let Some(text) = &self.text {
            let hit = contains_ci(&job.title, text)
                || contains_ci(&job.company, text)
                || job.tech_stack.iter().any(|t| contains_ci(t, text));
            if !hit {
                return false;
            }
        }
        if let Some(tech) = &self.tech {
            if !job.tech_stack.iter().any(|t| t == tech) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !contains_ci(&job.location, location) {
                return false;
            }
        }
        if self.upcoming_only && job.deadline < now {
            return false;
        }
        true
    }

    /// Descending keys put missing values last.
    pub fn sort(&self, jobs: &mut [Job]) {
        fn desc_opt(a: Option<f64>, b: Option<f64>) -> Ordering {
            match (a, b) {
                (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        match self.sort {
            JobSort::Deadline => jobs.sort_by(|a, b| a.deadline.cmp(&b.deadline)),
            JobSort::CreatedAt => jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            JobSort::Ctc => jobs.sort_by(|a, b| desc_opt(a.ctc, b.ctc)),
            JobSort::Stipend => jobs.sort_by(|a, b| desc_opt(a.stipend, b.stipend)),
        }
    }
}

/// Wraps user text for a substring `ILIKE`, escaping `%`, `_` and `\`.
pub fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
