use std::sync::Arc;

use crate::auth::JwtManager;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Postgres in production, an in-memory store under test.
    pub store: Arc<dyn Store>,
    pub jwt: JwtManager,
}
