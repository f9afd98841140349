//! Semantic search collaborator
//!
//! The engine never computes embeddings itself; it hands record short text to
//! an external nearest-neighbor service and gets back distance-ranked hits.
//! [`ChromaSearch`] speaks the HTTP bridge protocol; [`InMemorySearch`] is the
//! deterministic offline/test implementation of the same contract.

pub mod chroma;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

pub use chroma::ChromaSearch;
pub use memory::InMemorySearch;

/// One nearest-neighbor result
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Record id the document was indexed under
    pub id: Uuid,
    /// Indexed document text
    pub text: String,
    /// Raw distance reported by the backend; smaller is closer
    pub distance: f32,
}

impl SearchHit {
    /// Similarity in [0, 1] derived from the backend distance
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance.clamp(0.0, 1.0)
    }
}

/// Metadata attached to each indexed document
#[derive(Debug, Clone)]
pub struct SearchMetadata {
    pub agent_id: String,
    pub event_type: String,
    pub importance: u8,
}

/// Contract for the vector-similarity collaborator.
///
/// Documents live in per-agent collections; embeddings are computed by the
/// backend from the document text.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    /// Create a collection if it does not exist
    async fn create_collection(&self, collection: &str) -> Result<()>;

    /// Drop a collection and everything in it
    async fn delete_collection(&self, collection: &str) -> Result<()>;

    /// Index one document
    async fn add(
        &self,
        collection: &str,
        id: Uuid,
        text: &str,
        metadata: &SearchMetadata,
    ) -> Result<()>;

    /// Remove one document
    async fn remove(&self, collection: &str, id: Uuid) -> Result<()>;

    /// Nearest neighbors of `text`, optionally filtered by minimum importance
    async fn query(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
        min_importance: Option<u8>,
    ) -> Result<Vec<SearchHit>>;

    /// Number of documents in a collection
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Collection name for an agent's records
pub fn collection_for_agent(agent_id: &str) -> String {
    format!("npc_{agent_id}")
}
