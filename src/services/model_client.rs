use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    models::ModelRecommendResponse,
};

/// Ranking model abstraction
///
/// The model server is a separate deployment; everything that talks to it
/// goes through this trait so services can be tested against a mock. Calls
/// must carry a bounded timeout and must never run inside an open database
/// transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationModel: Send + Sync {
    /// Rank candidate movies for a free-text mood query
    async fn recommend_by_text(&self, text: &str, top_n: u32)
        -> AppResult<ModelRecommendResponse>;
}

/// HTTP client for the ranking model server
pub struct ModelServerClient {
    http_client: HttpClient,
    base_url: String,
}

impl ModelServerClient {
    pub fn new(base_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
        })
    }
}

#[async_trait::async_trait]
impl RecommendationModel for ModelServerClient {
    async fn recommend_by_text(
        &self,
        text: &str,
        top_n: u32,
    ) -> AppResult<ModelRecommendResponse> {
        let url = format!("{}/recommend/by-text", self.base_url);
        let top_n_param = top_n.to_string();

        tracing::debug!(top_n, "Querying ranking model");

        let response = self
            .http_client
            .get(&url)
            .query(&[("text", text), ("topN", top_n_param.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "Model server request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Model server returned status {}: {}",
                status, body
            )));
        }

        let ranked: ModelRecommendResponse = response.json().await?;

        tracing::info!(
            version = %ranked.version,
            candidates = ranked.items.len(),
            "Model server returned candidates"
        );

        Ok(ranked)
    }
}
