use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;

use crate::{
    db::{insert_or_conflict, InsertOutcome},
    error::AppResult,
    models::Keyword,
};

/// Canonical lookup key for a keyword name
///
/// Trimmed and case-folded; the stored display name keeps whatever casing
/// the first writer used.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Resolves names to keyword rows, creating missing ones
///
/// Returns keywords in first-seen input order with duplicates (by
/// normalized name) collapsed. Concurrent creators racing on the same name
/// lose the insert to the uniqueness constraint and reuse the winning row.
pub async fn resolve_or_create(
    conn: &mut SqliteConnection,
    names: &[String],
) -> AppResult<Vec<Keyword>> {
    // Normalize and de-duplicate, keeping first-seen order and casing
    let mut seen = HashSet::new();
    let mut wanted: Vec<(String, String)> = Vec::new();
    for raw in names {
        let display = raw.trim();
        if display.is_empty() {
            continue;
        }
        let norm = normalize_name(raw);
        if seen.insert(norm.clone()) {
            wanted.push((norm, display.to_string()));
        }
    }

    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    // One query for everything that already exists
    let norms: Vec<&str> = wanted.iter().map(|(norm, _)| norm.as_str()).collect();
    let mut by_norm: HashMap<String, Keyword> = fetch_by_norms(&mut *conn, &norms)
        .await?
        .into_iter()
        .map(|keyword| (keyword.name_norm.clone(), keyword))
        .collect();

    for (norm, display) in &wanted {
        if by_norm.contains_key(norm) {
            continue;
        }
        let keyword = create_keyword(&mut *conn, display, norm).await?;
        by_norm.insert(norm.clone(), keyword);
    }

    let mut resolved = Vec::with_capacity(wanted.len());
    for (norm, _) in &wanted {
        if let Some(keyword) = by_norm.get(norm) {
            resolved.push(keyword.clone());
        }
    }

    Ok(resolved)
}

/// Links keywords to a movie, skipping links that already exist
///
/// Returns the number of links created. The existing set is prefetched in
/// one query; a racing writer hitting the join-table constraint is treated
/// as already linked.
pub async fn link_to_movie(
    conn: &mut SqliteConnection,
    movie_id: i64,
    keywords: &[Keyword],
) -> AppResult<usize> {
    if keywords.is_empty() {
        return Ok(0);
    }

    let existing: HashSet<i64> =
        sqlx::query_scalar("SELECT keyword_id FROM movie_keywords WHERE movie_id = ?")
            .bind(movie_id)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .collect();

    let mut linked = 0;
    for keyword in keywords {
        if existing.contains(&keyword.id) {
            continue;
        }

        let result = sqlx::query("INSERT INTO movie_keywords (movie_id, keyword_id) VALUES (?, ?)")
            .bind(movie_id)
            .bind(keyword.id)
            .execute(&mut *conn)
            .await;

        if insert_or_conflict(result)?.is_inserted() {
            linked += 1;
        }
    }

    Ok(linked)
}

/// Resolves names and links them to a movie in one pass
pub async fn attach_keywords(
    conn: &mut SqliteConnection,
    movie_id: i64,
    names: &[String],
) -> AppResult<Vec<Keyword>> {
    let keywords = resolve_or_create(&mut *conn, names).await?;
    link_to_movie(&mut *conn, movie_id, &keywords).await?;
    Ok(keywords)
}

/// Inserts one keyword row
///
/// An insert that loses to a concurrent creator resolves to the existing
/// row, keeping its stored display casing.
async fn create_keyword(
    conn: &mut SqliteConnection,
    display: &str,
    norm: &str,
) -> AppResult<Keyword> {
    let result = sqlx::query("INSERT INTO keywords (name, name_norm) VALUES (?, ?)")
        .bind(display)
        .bind(norm)
        .execute(&mut *conn)
        .await;

    match insert_or_conflict(result)? {
        InsertOutcome::Inserted(done) => Ok(Keyword {
            id: done.last_insert_rowid(),
            name: display.to_string(),
            name_norm: norm.to_string(),
        }),
        InsertOutcome::AlreadyExists => {
            tracing::debug!(keyword = %norm, "Keyword created concurrently, reusing existing row");
            let existing: Keyword =
                sqlx::query_as("SELECT id, name, name_norm FROM keywords WHERE name_norm = ?")
                    .bind(norm)
                    .fetch_one(&mut *conn)
                    .await?;
            Ok(existing)
        }
    }
}

async fn fetch_by_norms(conn: &mut SqliteConnection, norms: &[&str]) -> AppResult<Vec<Keyword>> {
    if norms.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; norms.len()].join(", ");
    let sql = format!(
        "SELECT id, name, name_norm FROM keywords WHERE name_norm IN ({})",
        placeholders
    );

    let mut query = sqlx::query_as::<_, Keyword>(&sql);
    for norm in norms {
        query = query.bind(*norm);
    }

    Ok(query.fetch_all(conn).await?)
}
