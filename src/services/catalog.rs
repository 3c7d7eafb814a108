use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    db::{insert_or_conflict, InsertOutcome},
    error::AppResult,
    models::{Movie, MovieSummary, NewMovie},
    services::reference,
};

/// Looks up a single catalog movie
pub async fn find_by_id<'a, E>(db: E, movie_id: i64) -> AppResult<Option<Movie>>
where
    E: Executor<'a, Database = Sqlite>,
{
    let movie = sqlx::query_as("SELECT * FROM movies WHERE id = ?")
        .bind(movie_id)
        .fetch_optional(db)
        .await?;

    Ok(movie)
}

/// Batch lookup used to enrich recommendation and calendar responses
///
/// Ids missing from the catalog are simply absent from the map; callers
/// fall back to whatever the ranking model reported.
pub async fn find_summaries_by_ids<'a, E>(
    db: E,
    ids: &[i64],
) -> AppResult<HashMap<i64, MovieSummary>>
where
    E: Executor<'a, Database = Sqlite>,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT * FROM movies WHERE id IN ({})", placeholders);

    let mut query = sqlx::query_as::<_, Movie>(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    let movies = query.fetch_all(db).await?;

    Ok(movies
        .iter()
        .map(|movie| (movie.id, MovieSummary::from(movie)))
        .collect())
}

/// Writes a movie into the local catalog and attaches its keywords
///
/// Insert-first keyed on the upstream id; a row that already exists gets
/// its descriptive fields refreshed instead. Keywords go through the
/// shared resolver so concurrent ingesters converge on the same rows.
pub async fn save_movie(
    pool: &SqlitePool,
    movie: &NewMovie,
    keyword_names: &[String],
) -> AppResult<Movie> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO movies
            (id, tmdb_id, title, overview, poster_url, genre, release_date, vote_average, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(movie.id)
    .bind(movie.tmdb_id)
    .bind(&movie.title)
    .bind(&movie.overview)
    .bind(&movie.poster_url)
    .bind(&movie.genre)
    .bind(movie.release_date)
    .bind(movie.vote_average)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await;

    match insert_or_conflict(result)? {
        InsertOutcome::Inserted(_) => {
            tracing::info!(movie_id = movie.id, title = %movie.title, "Movie added to catalog");
        }
        InsertOutcome::AlreadyExists => {
            tracing::debug!(movie_id = movie.id, "Movie already in catalog, refreshing fields");
            sqlx::query(
                "UPDATE movies
                 SET tmdb_id = ?, title = ?, overview = ?, poster_url = ?, genre = ?,
                     release_date = ?, vote_average = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(movie.tmdb_id)
            .bind(&movie.title)
            .bind(&movie.overview)
            .bind(&movie.poster_url)
            .bind(&movie.genre)
            .bind(movie.release_date)
            .bind(movie.vote_average)
            .bind(now)
            .bind(movie.id)
            .execute(&mut *tx)
            .await?;
        }
    }

    reference::attach_keywords(&mut tx, movie.id, keyword_names).await?;

    let saved: Movie = sqlx::query_as("SELECT * FROM movies WHERE id = ?")
        .bind(movie.id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(saved)
}
