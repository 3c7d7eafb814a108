//! Shared helpers for database-backed tests.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::db;

/// Single-connection in-memory database with the full schema applied.
/// One connection is enough for sequential test bodies and keeps the
/// in-memory database visible to every query.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// On-disk database for tests that need real cross-connection concurrency.
/// The TempDir must stay alive as long as the pool.
pub async fn file_pool() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = db::create_pool(&url).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    (pool, dir)
}

pub async fn seed_user(pool: &SqlitePool, email: &str, role: &str) -> i64 {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (email, display_name, role, status, created_at, updated_at)
         VALUES (?, ?, ?, 'active', ?, ?)",
    )
    .bind(email)
    .bind(email.split('@').next().unwrap_or(email))
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn seed_movie(pool: &SqlitePool, id: i64, title: &str, genre: Option<&str>) {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO movies (id, title, genre, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(title)
    .bind(genre)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_input(
    pool: &SqlitePool,
    user_id: i64,
    text: &str,
    created_at: DateTime<Utc>,
) -> i64 {
    sqlx::query("INSERT INTO emotion_inputs (user_id, input_text, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(text)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn seed_recommendation(
    pool: &SqlitePool,
    user_id: i64,
    input_id: i64,
    movie_id: i64,
    similarity: f64,
    created_at: DateTime<Utc>,
) -> i64 {
    sqlx::query(
        "INSERT INTO recommendations (user_id, input_id, movie_id, similarity_score, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(input_id)
    .bind(movie_id)
    .bind(similarity)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

/// Seeds `count` recommendation rows (and their input) for the given moment.
pub async fn seed_daily_recommendations(
    pool: &SqlitePool,
    user_id: i64,
    count: i64,
    at: DateTime<Utc>,
) {
    let input_id = seed_input(pool, user_id, "seeded mood", at).await;
    for i in 0..count {
        seed_recommendation(pool, user_id, input_id, 1000 + i, 0.5, at).await;
    }
}
