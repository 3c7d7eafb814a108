use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::movie::MovieSummary;

/// One persisted recommendation row; never updated after insert
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Recommendation {
    pub id: i64,
    pub user_id: i64,
    pub input_id: i64,
    pub movie_id: i64,
    pub similarity_score: f64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Ranking model wire types
// ============================================================================

/// One candidate from the ranking model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub movie_id: i64,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub similarity: f64,
}

/// Response body of GET /recommend/by-text on the model server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecommendResponse {
    pub version: String,
    pub items: Vec<ModelCandidate>,
}

// ============================================================================
// API types
// ============================================================================

/// Request body for POST /api/v1/recommend/by-text
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendByTextRequest {
    pub text: String,
    #[serde(default, alias = "topN")]
    pub top_n: Option<u32>,
}

/// One recommended movie in an API response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedMovie {
    pub movie: MovieSummary,
    pub similarity: f64,
}

/// Result of a recommendation call
///
/// `input_id` is None when the daily quota was filled by a concurrent
/// request between the advisory check and the commit; `items` is empty in
/// that case and nothing was written.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendResponse {
    pub version: String,
    pub input_id: Option<i64>,
    pub items: Vec<RecommendedMovie>,
}

impl RecommendResponse {
    /// The well-formed result for a commit that lost the quota race
    pub fn empty(version: String) -> Self {
        Self {
            version,
            input_id: None,
            items: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_response_deserializes_wire_format() {
        let json = r#"{
            "version": "mood-ranker-2024-11",
            "items": [
                {"movie_id": 603, "title": "The Matrix", "genres": ["Action", "Sci-Fi"], "similarity": 0.91},
                {"movie_id": 680, "title": "Pulp Fiction", "similarity": 0.74}
            ]
        }"#;

        let response: ModelRecommendResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.version, "mood-ranker-2024-11");
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].movie_id, 603);
        assert_eq!(response.items[0].genres, vec!["Action", "Sci-Fi"]);
        // genres may be omitted on the wire
        assert!(response.items[1].genres.is_empty());
    }

    #[test]
    fn test_request_accepts_both_top_n_spellings() {
        let snake: RecommendByTextRequest =
            serde_json::from_str(r#"{"text": "cozy sunday", "top_n": 3}"#).unwrap();
        assert_eq!(snake.top_n, Some(3));

        let camel: RecommendByTextRequest =
            serde_json::from_str(r#"{"text": "cozy sunday", "topN": 3}"#).unwrap();
        assert_eq!(camel.top_n, Some(3));

        let absent: RecommendByTextRequest =
            serde_json::from_str(r#"{"text": "cozy sunday"}"#).unwrap();
        assert_eq!(absent.top_n, None);
    }

    #[test]
    fn test_empty_response_has_no_input_id() {
        let response = RecommendResponse::empty("v1".to_string());
        assert_eq!(response.version, "v1");
        assert_eq!(response.input_id, None);
        assert!(response.items.is_empty());
    }
}
