use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A movie in the local catalog
///
/// The id is assigned by the upstream catalog, so rows are written with an
/// explicit id rather than relying on rowid allocation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub tmdb_id: Option<i64>,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub vote_average: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog write payload (id and descriptive fields, no timestamps)
#[derive(Debug, Clone, Deserialize)]
pub struct NewMovie {
    pub id: i64,
    pub tmdb_id: Option<i64>,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub vote_average: Option<f64>,
}

/// Movie projection embedded in recommendation and calendar responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub movie_id: i64,
    pub tmdb_id: Option<i64>,
    pub title: String,
    pub poster_url: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub vote_average: Option<f64>,
}

impl MovieSummary {
    /// Projection for a movie the local catalog does not have yet.
    /// Only what the ranking model reported is filled in.
    pub fn minimal(movie_id: i64, title: &str, genre: Option<&str>) -> Self {
        Self {
            movie_id,
            tmdb_id: None,
            title: title.to_string(),
            poster_url: None,
            genre: genre.map(|g| g.to_string()),
            release_date: None,
            vote_average: None,
        }
    }
}

impl From<&Movie> for MovieSummary {
    fn from(movie: &Movie) -> Self {
        Self {
            movie_id: movie.id,
            tmdb_id: movie.tmdb_id,
            title: movie.title.clone(),
            poster_url: movie.poster_url.clone(),
            genre: movie.genre.clone(),
            release_date: movie.release_date,
            vote_average: movie.vote_average,
        }
    }
}

/// A normalized reference row for a keyword/genre name
///
/// `name` keeps the casing of the first writer; `name_norm` is the unique
/// lookup key shared by all spellings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Keyword {
    pub id: i64,
    pub name: String,
    pub name_norm: String,
}
