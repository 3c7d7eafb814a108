use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};
use crate::state::AppState;

pub mod calendar;
pub mod recommend;

/// Creates the application router with all routes
///
/// The request id layer runs before the trace layer so every request span
/// carries the id.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recommendations
        .route("/recommend/by-text", post(recommend::by_text))
        // Mood calendar
        .route("/calendar", get(calendar::month))
        .route("/calendar/entry", get(calendar::entry))
        .route("/calendar/entry", post(calendar::upsert_entry))
        .route("/calendar/entry", delete(calendar::delete_entry))
        // Share links, reachable without the identity header
        .route("/calendar/shared/:token", get(calendar::shared))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
