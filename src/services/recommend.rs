use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::{
        ModelRecommendResponse, MovieSummary, RecommendByTextRequest, RecommendResponse,
        RecommendedMovie, User,
    },
    services::{calendar, catalog, model_client::RecommendationModel, quota, reference},
};

/// Candidates requested from the model when the caller does not say
const DEFAULT_TOP_N: u32 = 20;

/// Upper bound on candidates requested from the model per call
const MAX_TOP_N: u32 = 50;

/// Full pipeline: gate, model call, atomic commit
///
/// The advisory gate fails fast and sizes the model request; the model is
/// queried outside any transaction; the commit re-checks the quota under
/// the write lock, so two pipelines racing past the gate cannot overfill
/// a user's day.
pub async fn recommend_by_text(
    pool: &SqlitePool,
    model: &dyn RecommendationModel,
    user_id: i64,
    request: RecommendByTextRequest,
) -> AppResult<RecommendResponse> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput("text must not be empty".to_string()));
    }
    if request.top_n == Some(0) {
        return Err(AppError::InvalidInput("top_n must be positive".to_string()));
    }

    // 1. Gate: active account and advisory allowance
    let user = quota::require_active_user(pool, user_id).await?;
    let remaining = quota::estimate_remaining(pool, &user).await?;
    if remaining <= 0 {
        return Err(AppError::QuotaExceeded(format!(
            "daily limit of {} recommendations reached",
            quota::MAX_DAILY
        )));
    }

    // 2. Model call, outside any transaction, sized by the allowance
    let requested = request.top_n.unwrap_or(DEFAULT_TOP_N).min(MAX_TOP_N);
    let top_n = (requested as i64).min(remaining) as u32;
    let ranked = model.recommend_by_text(text, top_n).await?;

    // 3. Atomic commit with the authoritative re-check
    commit(pool, &user, text, ranked).await
}

/// Commits one pipeline run in a single transaction
///
/// Inserts the input log, the ranked and truncated recommendation rows,
/// and the day's calendar snapshot together. A quota filled by a
/// concurrent commit is a legitimate outcome: the transaction rolls back,
/// nothing is written (not even the input log) and the caller gets a
/// well-formed empty result.
pub async fn commit(
    pool: &SqlitePool,
    user: &User,
    text: &str,
    ranked: ModelRecommendResponse,
) -> AppResult<RecommendResponse> {
    let mut tx = pool.begin().await?;

    // 1. First statement writes the user row: takes the write lock so the
    //    count below cannot interleave with another commit, and re-checks
    //    the account still exists and is active.
    quota::touch_user_for_update(&mut tx, user.user_id).await?;

    // 2. Authoritative allowance, re-read under the write lock
    let today = quota::today_utc();
    let allowed = if user.is_admin() {
        quota::UNLIMITED
    } else {
        quota::MAX_DAILY - quota::count_today(&mut *tx, user.user_id, today).await?
    };

    if allowed <= 0 {
        tx.rollback().await?;
        tracing::info!(
            user_id = user.user_id,
            "Daily quota filled concurrently, returning empty result"
        );
        return Ok(RecommendResponse::empty(ranked.version));
    }

    // 3. Best first; stable sort keeps model order on tied scores
    let mut candidates = ranked.items;
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    candidates.truncate(usize::try_from(allowed).unwrap_or(usize::MAX));

    // 4. Input log, then one row per kept candidate
    let now = Utc::now();
    let input_id =
        sqlx::query("INSERT INTO emotion_inputs (user_id, input_text, created_at) VALUES (?, ?, ?)")
            .bind(user.user_id)
            .bind(text)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

    for candidate in &candidates {
        sqlx::query(
            "INSERT INTO recommendations (user_id, input_id, movie_id, similarity_score, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.user_id)
        .bind(input_id)
        .bind(candidate.movie_id)
        .bind(candidate.similarity)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    // 5. Same-day calendar snapshot, same transaction
    calendar::record_input_for_today(&mut tx, user.user_id, today, text).await?;

    // 6. Best-effort enrichment. Movies the catalog knows also get the
    //    model's genres linked as keywords; unknown ids stay plain rows.
    let mut movie_ids: Vec<i64> = candidates.iter().map(|c| c.movie_id).collect();
    movie_ids.sort_unstable();
    movie_ids.dedup();
    let summaries = catalog::find_summaries_by_ids(&mut *tx, &movie_ids).await?;

    for candidate in &candidates {
        if summaries.contains_key(&candidate.movie_id) && !candidate.genres.is_empty() {
            reference::attach_keywords(&mut tx, candidate.movie_id, &candidate.genres).await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        user_id = user.user_id,
        input_id,
        saved = candidates.len(),
        "Recommendation commit complete"
    );

    let items = candidates
        .into_iter()
        .map(|candidate| {
            let movie = summaries.get(&candidate.movie_id).cloned().unwrap_or_else(|| {
                MovieSummary::minimal(
                    candidate.movie_id,
                    &candidate.title,
                    candidate.genres.first().map(|g| g.as_str()),
                )
            });
            RecommendedMovie {
                movie,
                similarity: candidate.similarity,
            }
        })
        .collect();

    Ok(RecommendResponse {
        version: ranked.version,
        input_id: Some(input_id),
        items,
    })
}
