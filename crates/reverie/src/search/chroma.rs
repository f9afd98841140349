//! HTTP client for the ChromaDB bridge
//!
//! The bridge is a thin HTTP wrapper around a ChromaDB instance that
//! auto-embeds document text. Responses follow Chroma's nested-array shape:
//! one inner array per query text (this client always sends exactly one).
//!
//! The minimal bridge serves collection create/delete, `/add`, and `/query`.
//! Document removal (`/delete`) and `/count` are extensions a deployment may
//! lack; without them those calls come back 404, which every caller in this
//! crate already treats as a logged warning, so index cleanup degrades to
//! best-effort and stale entries fall out via the missing-record check at
//! query time.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::search::{SearchHit, SearchMetadata, SemanticSearch};

/// Client for the ChromaDB HTTP bridge
#[derive(Debug, Clone)]
pub struct ChromaSearch {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<String>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: usize,
}

impl ChromaSearch {
    /// Create a client against a bridge base URL, e.g. `http://localhost:8001`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/collection/{collection}{suffix}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(MemoryError::Search(format!(
                "bridge returned {status}: {body}"
            )))
        }
    }
}

#[async_trait]
impl SemanticSearch for ChromaSearch {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(collection, ""))
            .send()
            .await
            .map_err(|e| MemoryError::Search(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(collection, ""))
            .send()
            .await
            .map_err(|e| MemoryError::Search(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn add(
        &self,
        collection: &str,
        id: Uuid,
        text: &str,
        metadata: &SearchMetadata,
    ) -> Result<()> {
        let body = json!({
            "ids": [id.to_string()],
            "documents": [text],
            "metadatas": [{
                "agent_id": metadata.agent_id,
                "event_type": metadata.event_type,
                "importance": metadata.importance,
            }],
        });
        let response = self
            .client
            .post(self.url(collection, "/add"))
            .json(&body)
            .send()
            .await
            .map_err(|e| MemoryError::Search(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    // Bridge extension route; see the module docs
    async fn remove(&self, collection: &str, id: Uuid) -> Result<()> {
        let body = json!({ "ids": [id.to_string()] });
        let response = self
            .client
            .post(self.url(collection, "/delete"))
            .json(&body)
            .send()
            .await
            .map_err(|e| MemoryError::Search(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
        min_importance: Option<u8>,
    ) -> Result<Vec<SearchHit>> {
        let mut body = json!({
            "query_texts": [text],
            "n_results": limit,
        });
        if let Some(floor) = min_importance {
            body["where"] = json!({ "importance": { "$gte": floor } });
        }

        let response = self
            .client
            .post(self.url(collection, "/query"))
            .json(&body)
            .send()
            .await
            .map_err(|e| MemoryError::Search(e.to_string()))?;
        let parsed: QueryResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MemoryError::Search(e.to_string()))?;

        let ids = parsed.ids.into_iter().next().unwrap_or_default();
        let documents = parsed.documents.into_iter().next().unwrap_or_default();
        let distances = parsed.distances.into_iter().next().unwrap_or_default();

        let mut hits = Vec::with_capacity(ids.len());
        for (index, raw_id) in ids.into_iter().enumerate() {
            // Hits with ids the engine never issued are backend noise; skip them
            let Ok(id) = raw_id.parse::<Uuid>() else {
                tracing::warn!(%raw_id, "ignoring search hit with non-uuid id");
                continue;
            };
            hits.push(SearchHit {
                id,
                text: documents.get(index).cloned().unwrap_or_default(),
                distance: distances.get(index).copied().unwrap_or(1.0),
            });
        }
        Ok(hits)
    }

    // Bridge extension route; see the module docs
    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .client
            .get(self.url(collection, "/count"))
            .send()
            .await
            .map_err(|e| MemoryError::Search(e.to_string()))?;
        let parsed: CountResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MemoryError::Search(e.to_string()))?;
        Ok(parsed.count)
    }
}
