//! Fixtures shared by unit and router tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::applications::eligibility::submit_application;
use crate::auth::{JwtConfig, JwtManager};
use crate::models::application::Application;
use crate::models::job::{EligibilityRules, Job};
use crate::models::user::{Experience, ExperienceKind, FullName, Role, User};
use crate::state::AppState;
use crate::store::memory::MemoryStore;

pub const TEST_SECRET: &str = "test-secret-that-is-at-least-32-bytes";

fn account(email: String, role: Role, first: &str, last: &str) -> User {
    User::new(
        email,
        "$argon2id$not-a-real-hash".to_string(),
        role,
        FullName {
            first: first.to_string(),
            last: last.to_string(),
        },
        Utc::now(),
    )
}

/// An eligible CSE student with a resume. Unique email per call.
pub fn student() -> User {
    let mut user = account(
        format!("student-{}@demo.in", Uuid::new_v4().simple()),
        Role::Student,
        "Raj",
        "Kumar",
    );
    user.phone = Some("9876543210".to_string());
    user.branch = Some("CSE".to_string());
    user.ug_cgpa = Some(8.2);
    user.ug_percentage = Some(82.5);
    user.resume_url = Some("https://drive.example.com/raj-cv.pdf".to_string());
    user.skills = vec!["Rust".to_string(), "React".to_string(), "SQL".to_string()];
    user.links = Json(BTreeMap::from([(
        "github".to_string(),
        "https://github.com/rajk".to_string(),
    )]));
    user
}

pub fn coordinator() -> User {
    account(
        format!("tpo-{}@demo.in", Uuid::new_v4().simple()),
        Role::Coordinator,
        "Anita",
        "Rao",
    )
}

/// A job posted by `owner`: min CGPA 7.5, CSE only.
pub fn job_for(owner: &User, deadline: DateTime<Utc>) -> Job {
    Job {
        id: Uuid::new_v4(),
        title: "Software Engineer".to_string(),
        company: "Google".to_string(),
        employment_type: "Full-time".to_string(),
        location: "Bangalore".to_string(),
        ctc: Some(1_800_000.0),
        stipend: None,
        tech_stack: vec!["Rust".to_string(), "Kubernetes".to_string()],
        deadline,
        eligibility: Json(EligibilityRules {
            min_cgpa: Some(7.5),
            min_percentage: None,
            branches: Some(vec!["CSE".to_string()]),
            backlogs_allowed: None,
        }),
        description: Some("Build infrastructure.".to_string()),
        created_by: owner.id,
        created_at: Utc::now(),
    }
}

pub fn experience(kind: ExperienceKind, title: &str) -> Experience {
    Experience {
        id: Uuid::new_v4(),
        kind,
        company: Some("Tech Corp".to_string()),
        title: title.to_string(),
        location: None,
        start_date: None,
        end_date: None,
        is_current: false,
        summary: None,
        technologies: vec!["Rust".to_string()],
        achievements: Vec::new(),
        links: Vec::new(),
        proof: None,
    }
}

pub fn jwt() -> JwtManager {
    JwtManager::new(JwtConfig {
        secret: TEST_SECRET.to_string(),
        issuer: "placement-portal".to_string(),
        ttl: Duration::hours(1),
    })
    .unwrap()
}

pub async fn submit(store: &MemoryStore, user: &User, job_id: Uuid) -> Application {
    submit_application(store, user, job_id, Utc::now())
        .await
        .unwrap()
}

/// State over a fresh in-memory store, returned alongside it for seeding.
pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let state = AppState {
        store: store.clone(),
        jwt: jwt(),
    };
    (state, store)
}
