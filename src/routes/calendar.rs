use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{CalendarEntryResponse, UpsertEntryRequest},
    services::calendar,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

/// Handler for the month view
pub async fn month(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<Vec<CalendarEntryResponse>>> {
    let entries = calendar::month_entries(&state.pool, user_id, query.year, query.month).await?;
    Ok(Json(entries))
}

/// Handler for a single day; synthesized when the day has no entry yet
pub async fn entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<CalendarEntryResponse>> {
    let entry = calendar::entry_for_date(&state.pool, user_id, query.date).await?;
    Ok(Json(entry))
}

/// Handler for creating or editing a day's entry
pub async fn upsert_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<UpsertEntryRequest>,
) -> AppResult<Json<CalendarEntryResponse>> {
    tracing::info!(user_id, date = %request.date, "Upserting calendar entry");

    let entry = calendar::upsert_fields(&state.pool, user_id, &request).await?;
    Ok(Json(entry))
}

/// Handler for deleting a day's entry
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<DateQuery>,
) -> AppResult<StatusCode> {
    calendar::delete_entry(&state.pool, user_id, query.date).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for the share link; the token is the only credential
pub async fn shared(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<CalendarEntryResponse>> {
    let entry = calendar::shared_entry(&state.pool, &token).await?;
    Ok(Json(entry))
}
