use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    db::{insert_or_conflict, InsertOutcome},
    error::{AppError, AppResult},
    models::{
        CalendarEntry, CalendarEntryResponse, MovieSummary, Recommendation, RecommendedMovie,
        UpsertEntryRequest,
    },
    services::{catalog, quota},
};

/// Title used when a recommended movie is missing from the local catalog
const UNKNOWN_TITLE: &str = "Unknown";

/// What a write wants to change on the day's entry. Each path owns its
/// fields and must not clobber the other's.
enum EntryChange<'a> {
    /// Recommendation path: replace only the latest input text
    InputText(&'a str),
    /// Edit path: replace note, mood and movie selection wholesale
    Fields {
        note: Option<&'a str>,
        mood_emoji: Option<&'a str>,
        movie_id: Option<i64>,
    },
}

// ============================================================================
// Write paths
// ============================================================================

/// Upsert for the recommendation pipeline
///
/// Runs inside the commit transaction and touches only the latest input
/// text, so it can never clobber a note or mood written by the edit path.
pub async fn record_input_for_today(
    conn: &mut SqliteConnection,
    user_id: i64,
    date: NaiveDate,
    text: &str,
) -> AppResult<CalendarEntry> {
    upsert_entry(conn, user_id, date, EntryChange::InputText(text)).await
}

/// Upsert for the calendar-edit endpoint
///
/// Owns note/mood/movie wholesale: omitted fields clear stored values and
/// a null movie clears the selection. A referenced movie must exist. The
/// latest input text is never touched here.
pub async fn upsert_fields(
    pool: &SqlitePool,
    user_id: i64,
    request: &UpsertEntryRequest,
) -> AppResult<CalendarEntryResponse> {
    let mut tx = pool.begin().await?;
    quota::touch_user_for_update(&mut tx, user_id).await?;

    if let Some(movie_id) = request.movie_id {
        if catalog::find_by_id(&mut *tx, movie_id).await?.is_none() {
            return Err(AppError::NotFound(format!("movie {}", movie_id)));
        }
    }

    let change = EntryChange::Fields {
        note: request.note.as_deref(),
        mood_emoji: request.mood_emoji.as_deref(),
        movie_id: request.movie_id,
    };
    let entry = upsert_entry(&mut tx, user_id, request.date, change).await?;
    tx.commit().await?;

    tracing::info!(user_id, date = %request.date, "Calendar entry saved");

    build_response(pool, &entry).await
}

/// Deletes the entry for one day; the day's recommendation log is kept
pub async fn delete_entry(pool: &SqlitePool, user_id: i64, date: NaiveDate) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    quota::touch_user_for_update(&mut tx, user_id).await?;

    let done = sqlx::query("DELETE FROM calendar_entries WHERE user_id = ? AND date = ?")
        .bind(user_id)
        .bind(date)
        .execute(&mut *tx)
        .await?;

    if done.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("calendar entry for {}", date)));
    }
    tx.commit().await?;

    tracing::info!(user_id, date = %date, "Deleted calendar entry");
    Ok(())
}

/// Get-or-create for one (user, date) row, merging only the caller's fields
///
/// The uniqueness constraint on (user_id, date) is the arbiter when two
/// writers race on a fresh day: the loser's insert comes back as a
/// conflict and gets exactly one re-fetch to merge into the winner's row.
/// A recovered race is logged, never surfaced.
async fn upsert_entry(
    conn: &mut SqliteConnection,
    user_id: i64,
    date: NaiveDate,
    change: EntryChange<'_>,
) -> AppResult<CalendarEntry> {
    if let Some(existing) = fetch_entry(&mut *conn, user_id, date).await? {
        return update_entry(conn, &existing, &change).await;
    }
    create_entry(conn, user_id, date, &change).await
}

/// Inserts a fresh row with its one-time share token
///
/// An insert that loses to a concurrent creator re-fetches the winning
/// row once and merges into it; the losing token is discarded.
async fn create_entry(
    conn: &mut SqliteConnection,
    user_id: i64,
    date: NaiveDate,
    change: &EntryChange<'_>,
) -> AppResult<CalendarEntry> {
    let share_token = Uuid::new_v4().to_string();
    let now = Utc::now();
    let (note, mood_emoji, movie_id, user_input_text) = match change {
        EntryChange::InputText(text) => (None, None, None, Some(*text)),
        EntryChange::Fields {
            note,
            mood_emoji,
            movie_id,
        } => (*note, *mood_emoji, *movie_id, None),
    };

    let result = sqlx::query(
        "INSERT INTO calendar_entries
            (user_id, date, share_token, note, mood_emoji, movie_id, user_input_text, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(date)
    .bind(&share_token)
    .bind(note)
    .bind(mood_emoji)
    .bind(movie_id)
    .bind(user_input_text)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await;

    match insert_or_conflict(result)? {
        InsertOutcome::Inserted(done) => {
            tracing::info!(user_id, date = %date, "Created calendar entry");
            fetch_entry_by_id(conn, done.last_insert_rowid()).await
        }
        InsertOutcome::AlreadyExists => {
            tracing::info!(
                user_id,
                date = %date,
                "Calendar entry created concurrently, merging into existing row"
            );
            match fetch_entry(&mut *conn, user_id, date).await? {
                Some(existing) => update_entry(conn, &existing, change).await,
                None => Err(AppError::Conflict(format!(
                    "calendar entry for {} could not be created",
                    date
                ))),
            }
        }
    }
}

/// Applies a change to an existing row, leaving the other path's fields
/// and the share token untouched
async fn update_entry(
    conn: &mut SqliteConnection,
    entry: &CalendarEntry,
    change: &EntryChange<'_>,
) -> AppResult<CalendarEntry> {
    let now = Utc::now();

    match change {
        EntryChange::InputText(text) => {
            sqlx::query("UPDATE calendar_entries SET user_input_text = ?, updated_at = ? WHERE id = ?")
                .bind(*text)
                .bind(now)
                .bind(entry.id)
                .execute(&mut *conn)
                .await?;
        }
        EntryChange::Fields {
            note,
            mood_emoji,
            movie_id,
        } => {
            let unchanged = entry.note.as_deref() == *note
                && entry.mood_emoji.as_deref() == *mood_emoji
                && entry.movie_id == *movie_id;
            if unchanged {
                tracing::debug!(entry_id = entry.id, "No field changes, keeping entry as is");
                return Ok(entry.clone());
            }

            sqlx::query(
                "UPDATE calendar_entries
                 SET note = ?, mood_emoji = ?, movie_id = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(*note)
            .bind(*mood_emoji)
            .bind(*movie_id)
            .bind(now)
            .bind(entry.id)
            .execute(&mut *conn)
            .await?;
        }
    }

    fetch_entry_by_id(conn, entry.id).await
}

// ============================================================================
// Read paths
// ============================================================================

/// All entries of one month, enriched with three batched queries
pub async fn month_entries(
    pool: &SqlitePool,
    user_id: i64,
    year: i32,
    month: u32,
) -> AppResult<Vec<CalendarEntryResponse>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::InvalidInput(format!("invalid month {}-{}", year, month)))?;
    let next_first = match month {
        12 => NaiveDate::from_ymd_opt(year + 1, 1, 1),
        _ => NaiveDate::from_ymd_opt(year, month + 1, 1),
    }
    .ok_or_else(|| AppError::InvalidInput(format!("invalid month {}-{}", year, month)))?;

    let entries: Vec<CalendarEntry> = sqlx::query_as(
        "SELECT * FROM calendar_entries WHERE user_id = ? AND date >= ? AND date < ? ORDER BY date",
    )
    .bind(user_id)
    .bind(first)
    .bind(next_first)
    .fetch_all(pool)
    .await?;

    let (month_start, _) = quota::day_bounds(first);
    let (month_end, _) = quota::day_bounds(next_first);
    let recommendations: Vec<Recommendation> = sqlx::query_as(
        "SELECT * FROM recommendations
         WHERE user_id = ? AND created_at >= ? AND created_at < ?
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(month_start)
    .bind(month_end)
    .fetch_all(pool)
    .await?;

    let mut movie_ids: Vec<i64> = entries
        .iter()
        .filter_map(|entry| entry.movie_id)
        .chain(recommendations.iter().map(|rec| rec.movie_id))
        .collect();
    movie_ids.sort_unstable();
    movie_ids.dedup();
    let summaries = catalog::find_summaries_by_ids(pool, &movie_ids).await?;

    let mut by_day: HashMap<NaiveDate, Vec<Recommendation>> = HashMap::new();
    for rec in recommendations {
        by_day.entry(rec.created_at.date_naive()).or_default().push(rec);
    }

    let responses = entries
        .iter()
        .map(|entry| {
            let day_recs = by_day
                .get(&entry.date)
                .map(|recs| {
                    recs.iter()
                        .take(quota::MAX_DAILY as usize)
                        .map(|rec| to_recommended(rec, &summaries))
                        .collect()
                })
                .unwrap_or_default();
            let selected = entry
                .movie_id
                .and_then(|id| summaries.get(&id).cloned());
            CalendarEntryResponse::from_entry(entry, selected, day_recs)
        })
        .collect();

    Ok(responses)
}

/// One day's entry, or a synthetic response when the day has
/// recommendations but no entry (or neither)
pub async fn entry_for_date(
    pool: &SqlitePool,
    user_id: i64,
    date: NaiveDate,
) -> AppResult<CalendarEntryResponse> {
    let entry = fetch_entry(pool, user_id, date).await?;

    match entry {
        Some(entry) => build_response(pool, &entry).await,
        None => {
            let recommendations = day_recommendations(pool, user_id, date).await?;
            Ok(CalendarEntryResponse::synthetic(date, recommendations))
        }
    }
}

/// Public view of an entry by its share token
///
/// The token shape is validated before any query, so malformed input is
/// indistinguishable from an unknown token.
pub async fn shared_entry(pool: &SqlitePool, token: &str) -> AppResult<CalendarEntryResponse> {
    let parsed =
        Uuid::parse_str(token).map_err(|_| AppError::NotFound("shared entry".to_string()))?;

    let entry: Option<CalendarEntry> =
        sqlx::query_as("SELECT * FROM calendar_entries WHERE share_token = ?")
            .bind(parsed.to_string())
            .fetch_optional(pool)
            .await?;

    match entry {
        Some(entry) => build_response(pool, &entry).await,
        None => Err(AppError::NotFound("shared entry".to_string())),
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn fetch_entry<'a, E>(
    db: E,
    user_id: i64,
    date: NaiveDate,
) -> AppResult<Option<CalendarEntry>>
where
    E: Executor<'a, Database = Sqlite>,
{
    let entry = sqlx::query_as("SELECT * FROM calendar_entries WHERE user_id = ? AND date = ?")
        .bind(user_id)
        .bind(date)
        .fetch_optional(db)
        .await?;
    Ok(entry)
}

async fn fetch_entry_by_id<'a, E>(db: E, id: i64) -> AppResult<CalendarEntry>
where
    E: Executor<'a, Database = Sqlite>,
{
    let entry = sqlx::query_as("SELECT * FROM calendar_entries WHERE id = ?")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(entry)
}

/// The day's latest recommendations, newest first, capped at the daily
/// quota (admins can exceed it in storage, not in this view)
async fn day_recommendations(
    pool: &SqlitePool,
    user_id: i64,
    date: NaiveDate,
) -> AppResult<Vec<RecommendedMovie>> {
    let (start, end) = quota::day_bounds(date);
    let recommendations: Vec<Recommendation> = sqlx::query_as(
        "SELECT * FROM recommendations
         WHERE user_id = ? AND created_at >= ? AND created_at < ?
         ORDER BY created_at DESC, id DESC
         LIMIT ?",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .bind(quota::MAX_DAILY)
    .fetch_all(pool)
    .await?;

    let mut movie_ids: Vec<i64> = recommendations.iter().map(|rec| rec.movie_id).collect();
    movie_ids.sort_unstable();
    movie_ids.dedup();
    let summaries = catalog::find_summaries_by_ids(pool, &movie_ids).await?;

    Ok(recommendations
        .iter()
        .map(|rec| to_recommended(rec, &summaries))
        .collect())
}

fn to_recommended(
    rec: &Recommendation,
    summaries: &HashMap<i64, MovieSummary>,
) -> RecommendedMovie {
    let movie = summaries
        .get(&rec.movie_id)
        .cloned()
        .unwrap_or_else(|| MovieSummary::minimal(rec.movie_id, UNKNOWN_TITLE, None));
    RecommendedMovie {
        movie,
        similarity: rec.similarity_score,
    }
}

async fn build_response(
    pool: &SqlitePool,
    entry: &CalendarEntry,
) -> AppResult<CalendarEntryResponse> {
    let selected = match entry.movie_id {
        Some(id) => catalog::find_summaries_by_ids(pool, &[id]).await?.remove(&id),
        None => None,
    };
    let recommendations = day_recommendations(pool, entry.user_id, entry.date).await?;
    Ok(CalendarEntryResponse::from_entry(entry, selected, recommendations))
}
