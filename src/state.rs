use std::sync::Arc;

use sqlx::SqlitePool;

use crate::services::RecommendationModel;

/// Shared application state
///
/// The pool is already reference-counted, so the state clones cheaply into
/// every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub model: Arc<dyn RecommendationModel>,
}

impl AppState {
    pub fn new(pool: SqlitePool, model: Arc<dyn RecommendationModel>) -> Self {
        Self { pool, model }
    }
}
