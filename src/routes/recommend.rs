use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    middleware::{AuthUser, RequestId},
    models::{RecommendByTextRequest, RecommendResponse},
    services::recommend,
    state::AppState,
};

/// Handler for mood-to-movies recommendations
pub async fn by_text(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendByTextRequest>,
) -> AppResult<Json<RecommendResponse>> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        "Processing recommendation request"
    );

    let response =
        recommend::recommend_by_text(&state.pool, state.model.as_ref(), user_id, request).await?;

    tracing::info!(
        request_id = %request_id,
        saved = response.items.len(),
        "Recommendation request completed"
    );

    Ok(Json(response))
}
