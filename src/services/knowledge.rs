//! Knowledge search over an HTTP vector-store API

use async_trait::async_trait;

use super::{KnowledgeChunk, KnowledgeSearch};
use crate::config::KnowledgeConfig;
use crate::{Error, Result};

#[derive(serde::Serialize)]
struct SearchRequest<'a> {
    collection: &'a str,
    query: &'a str,
    k: usize,
    threshold: f32,
}

#[derive(serde::Deserialize)]
struct SearchResponse {
    results: Vec<KnowledgeChunk>,
}

/// Vector similarity search against an HTTP endpoint
pub struct HttpKnowledgeStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl HttpKnowledgeStore {
    /// Create a search client from configuration
    #[must_use]
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        }
    }
}

#[async_trait]
impl KnowledgeSearch for HttpKnowledgeStore {
    async fn search(
        &self,
        query: &str,
        max_chunks: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<KnowledgeChunk>> {
        tracing::debug!(
            collection = %self.collection,
            k = max_chunks,
            threshold = similarity_threshold,
            "searching knowledge store"
        );

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest {
                collection: &self.collection,
                query,
                k: max_chunks,
                threshold: similarity_threshold,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ServiceUnavailable(format!(
                "knowledge search error {status}: {body}"
            )));
        }

        let result: SearchResponse = response.json().await?;

        // The contract is descending score order; enforce it rather than
        // trusting the backend.
        let mut chunks = result.results;
        chunks.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::debug!(chunks = chunks.len(), "knowledge search complete");
        Ok(chunks)
    }
}
