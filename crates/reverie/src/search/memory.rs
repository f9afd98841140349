//! In-memory search backend
//!
//! Deterministic stand-in for the vector backend, used offline and in tests.
//! Distance is one minus token overlap (Jaccard), so identical texts are at
//! distance zero and disjoint texts at distance one — no model required,
//! same results on every run.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::search::{SearchHit, SearchMetadata, SemanticSearch};

#[derive(Debug, Clone)]
struct Document {
    text: String,
    importance: u8,
}

/// Deterministic token-overlap search over in-memory collections
#[derive(Debug, Default)]
pub struct InMemorySearch {
    collections: DashMap<String, HashMap<Uuid, Document>>,
}

impl InMemorySearch {
    pub fn new() -> Self {
        Self::default()
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard distance between two token sets
fn token_distance(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    1.0 - intersection / union
}

#[async_trait]
impl SemanticSearch for InMemorySearch {
    async fn create_collection(&self, collection: &str) -> Result<()> {
        self.collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.collections.remove(collection);
        Ok(())
    }

    async fn add(
        &self,
        collection: &str,
        id: Uuid,
        text: &str,
        metadata: &SearchMetadata,
    ) -> Result<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(
                id,
                Document {
                    text: text.to_string(),
                    importance: metadata.importance,
                },
            );
        Ok(())
    }

    async fn remove(&self, collection: &str, id: Uuid) -> Result<()> {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(&id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
        min_importance: Option<u8>,
    ) -> Result<Vec<SearchHit>> {
        let Some(docs) = self.collections.get(collection) else {
            return Err(MemoryError::Search(format!(
                "unknown collection '{collection}'"
            )));
        };

        let query_tokens = tokens(text);
        let mut hits: Vec<SearchHit> = docs
            .iter()
            .filter(|(_, doc)| min_importance.is_none_or(|floor| doc.importance >= floor))
            .map(|(id, doc)| SearchHit {
                id: *id,
                text: doc.text.clone(),
                distance: token_distance(&query_tokens, &tokens(&doc.text)),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0))
    }
}
