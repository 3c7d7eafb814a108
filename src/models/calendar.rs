use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::movie::MovieSummary;
use crate::models::recommend::RecommendedMovie;

/// One mood-calendar row; at most one per (user, date), enforced by a
/// uniqueness constraint rather than application logic.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CalendarEntry {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    /// Opaque public handle for the shared view. Generated once at row
    /// creation and never rotated.
    pub share_token: String,
    pub note: Option<String>,
    pub mood_emoji: Option<String>,
    pub movie_id: Option<i64>,
    pub user_input_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for POST /api/v1/calendar/entry
///
/// The edit path owns note/mood/movie wholesale: omitted fields clear the
/// stored value, and a null movie_id clears the selection.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertEntryRequest {
    pub date: NaiveDate,
    pub note: Option<String>,
    pub mood_emoji: Option<String>,
    pub movie_id: Option<i64>,
}

/// Calendar entry as returned by the API
///
/// `id` is the share token, not the row id; it is absent on the synthetic
/// response for a day without an entry.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEntryResponse {
    pub id: Option<String>,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub mood_emoji: Option<String>,
    pub selected_movie: Option<MovieSummary>,
    pub latest_input_text: Option<String>,
    pub recommendations: Vec<RecommendedMovie>,
}

impl CalendarEntryResponse {
    /// Response for a day that has recommendations but no calendar entry
    pub fn synthetic(date: NaiveDate, recommendations: Vec<RecommendedMovie>) -> Self {
        Self {
            id: None,
            date,
            note: None,
            mood_emoji: None,
            selected_movie: None,
            latest_input_text: None,
            recommendations,
        }
    }

    pub fn from_entry(
        entry: &CalendarEntry,
        selected_movie: Option<MovieSummary>,
        recommendations: Vec<RecommendedMovie>,
    ) -> Self {
        Self {
            id: Some(entry.share_token.clone()),
            date: entry.date,
            note: entry.note.clone(),
            mood_emoji: entry.mood_emoji.clone(),
            selected_movie,
            latest_input_text: entry.user_input_text.clone(),
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CalendarEntry {
        CalendarEntry {
            id: 1,
            user_id: 9,
            date: NaiveDate::from_ymd_opt(2024, 11, 5).unwrap(),
            share_token: "3f8a2c1e-8f51-4c3a-9d34-6f1f60a1b0cd".to_string(),
            note: Some("rainy evening".to_string()),
            mood_emoji: Some("🌧️".to_string()),
            movie_id: Some(603),
            user_input_text: Some("want something contemplative".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_response_exposes_share_token_as_id() {
        let response = CalendarEntryResponse::from_entry(&entry(), None, Vec::new());

        assert_eq!(
            response.id.as_deref(),
            Some("3f8a2c1e-8f51-4c3a-9d34-6f1f60a1b0cd")
        );
        assert_eq!(response.note.as_deref(), Some("rainy evening"));
        assert_eq!(
            response.latest_input_text.as_deref(),
            Some("want something contemplative")
        );
    }

    #[test]
    fn test_synthetic_response_has_no_id() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 6).unwrap();
        let response = CalendarEntryResponse::synthetic(date, Vec::new());

        assert_eq!(response.id, None);
        assert_eq!(response.date, date);
        assert!(response.recommendations.is_empty());
    }

    #[test]
    fn test_row_id_never_serialized_as_public_id() {
        let response = CalendarEntryResponse::from_entry(&entry(), None, Vec::new());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json["id"],
            serde_json::json!("3f8a2c1e-8f51-4c3a-9d34-6f1f60a1b0cd")
        );
    }
}
