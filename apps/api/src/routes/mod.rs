pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::applications::handlers as applications;
use crate::auth::handlers as auth;
use crate::jobs::handlers as jobs;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/register", post(auth::handle_register))
        .route("/login", post(auth::handle_login))
        // Profile
        .route(
            "/me",
            get(profile::handle_get_me).put(profile::handle_update_me),
        )
        .route("/me/experience", post(profile::handle_add_experience))
        .route(
            "/me/experience/:id",
            put(profile::handle_update_experience).delete(profile::handle_delete_experience),
        )
        // Jobs
        .route("/jobs", get(jobs::handle_list).post(jobs::handle_create))
        .route(
            "/jobs/:id",
            get(jobs::handle_get)
                .put(jobs::handle_update)
                .delete(jobs::handle_delete),
        )
        .route(
            "/jobs/:id/applications",
            get(applications::handle_list_for_job),
        )
        .route("/coord/jobs", get(jobs::handle_list_own))
        // Applications
        .route(
            "/applications",
            get(applications::handle_list).post(applications::handle_submit),
        )
        .route(
            "/applications/:id/status",
            put(applications::handle_update_status),
        )
        .with_state(state)
}
