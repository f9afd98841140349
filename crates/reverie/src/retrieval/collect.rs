//! Candidate collection
//!
//! Gathers retrieval candidates from three independent sources and merges
//! them in fixed precedence (earlier source wins on duplicate id):
//!
//! - **A. Protected** — the live relationship header, records in protected
//!   slots, and all active pinned records. Always included.
//! - **B. High-signal recent** — configured event types inside the recency
//!   window, newest first, capped.
//! - **C. Semantic top-K** — nearest neighbors from the search collaborator,
//!   importance-filtered, capped, excluding ids already collected.
//!
//! The three fetches run concurrently; the merge order is always A, B, C.
//! A failing collaborator never aborts the retrieval: a storage outage
//! degrades sources A and B to the synthesized header alone, and a failing
//! search backend degrades source C to empty.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::record::{MemoryRecord, RelationshipState, RetrievalQuery, Tier};
use crate::retrieval::header::{RelationshipHeaderGenerator, SyntheticHeader};
use crate::search::{SemanticSearch, collection_for_agent};
use crate::store::{RecordFilter, RecordStorage};

/// What a candidate wraps: a stored record or the synthesized header
#[derive(Debug, Clone)]
pub enum CandidateBody {
    Header(SyntheticHeader),
    Record(MemoryRecord),
}

/// One retrieval candidate, discarded after selection
#[derive(Debug, Clone)]
pub struct Candidate {
    pub body: CandidateBody,
    /// Protected candidates bypass scoring and budget limits
    pub protected: bool,
    /// Similarity from the search collaborator, when it produced this one
    pub similarity: Option<f32>,
}

impl Candidate {
    /// Record id; the nil uuid for the header
    pub fn id(&self) -> Uuid {
        match &self.body {
            CandidateBody::Header(_) => Uuid::nil(),
            CandidateBody::Record(record) => record.id,
        }
    }

    /// Creation time used for deterministic tie-breaking; the header sorts
    /// before any record
    pub fn created_at(&self) -> DateTime<Utc> {
        match &self.body {
            CandidateBody::Header(_) => DateTime::<Utc>::MIN_UTC,
            CandidateBody::Record(record) => record.created_at,
        }
    }

    pub fn record(&self) -> Option<&MemoryRecord> {
        match &self.body {
            CandidateBody::Record(record) => Some(record),
            CandidateBody::Header(_) => None,
        }
    }
}

/// Merges the three candidate sources for one retrieval
pub struct CandidateCollector {
    config: Arc<MemoryConfig>,
    storage: Arc<dyn RecordStorage>,
    search: Arc<dyn SemanticSearch>,
    header_generator: RelationshipHeaderGenerator,
}

impl CandidateCollector {
    pub fn new(
        config: Arc<MemoryConfig>,
        storage: Arc<dyn RecordStorage>,
        search: Arc<dyn SemanticSearch>,
    ) -> Self {
        let header_generator = RelationshipHeaderGenerator::new(storage.clone());
        Self {
            config,
            storage,
            search,
            header_generator,
        }
    }

    /// Collect the deduplicated candidate set for one dialogue turn
    pub async fn collect(
        &self,
        agent_id: &str,
        state: &RelationshipState,
        query: &RetrievalQuery,
    ) -> Result<Vec<Candidate>> {
        let (protected, recent, semantic) = tokio::join!(
            self.protected_source(agent_id, state),
            self.recent_source(agent_id),
            self.semantic_source(agent_id, query),
        );
        // Degrade gracefully: a dialogue turn with partial context beats no
        // turn at all.
        let recent = recent.unwrap_or_else(|err| {
            tracing::warn!(agent_id, %err, "recent source unavailable, degrading to empty");
            Vec::new()
        });
        let semantic = semantic.unwrap_or_else(|err| {
            tracing::warn!(agent_id, %err, "semantic source unavailable, degrading to empty");
            Vec::new()
        });

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut merged = Vec::new();
        for candidate in protected.into_iter().chain(recent).chain(semantic) {
            if seen.insert(candidate.id()) {
                merged.push(candidate);
            }
        }
        tracing::debug!(agent_id, candidates = merged.len(), "collected candidates");
        Ok(merged)
    }

    /// Source A: header + protected slots + pinned records. The header is
    /// unconditional; a storage outage costs only the stored records.
    async fn protected_source(
        &self,
        agent_id: &str,
        state: &RelationshipState,
    ) -> Vec<Candidate> {
        let header = self.header_generator.generate(agent_id, state).await;
        let mut candidates = vec![Candidate {
            body: CandidateBody::Header(header),
            protected: true,
            similarity: None,
        }];

        let records = self.protected_records(agent_id).await.unwrap_or_else(|err| {
            tracing::warn!(agent_id, %err, "protected source degraded to header only");
            Vec::new()
        });
        candidates.extend(records.into_iter().map(|record| Candidate {
            body: CandidateBody::Record(record),
            protected: true,
            similarity: None,
        }));
        candidates
    }

    async fn protected_records(&self, agent_id: &str) -> Result<Vec<MemoryRecord>> {
        let mut records = Vec::new();
        for slot in &self.config.protected_slots {
            records.extend(
                self.storage
                    .find(
                        agent_id,
                        &RecordFilter::new().with_slot(slot.clone()).active_only(),
                    )
                    .await?,
            );
        }
        records.extend(
            self.storage
                .find(
                    agent_id,
                    &RecordFilter::new().with_tier(Tier::Pinned).active_only(),
                )
                .await?,
        );
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records.dedup_by_key(|r| r.id);
        Ok(records)
    }

    /// Source B: high-signal event types inside the recency window
    async fn recent_source(&self, agent_id: &str) -> Result<Vec<Candidate>> {
        let since = Utc::now() - Duration::days(self.config.retrieval.recent_window_days);
        let mut records = Vec::new();
        for event_type in &self.config.events.high_signal_events {
            records.extend(
                self.storage
                    .find(
                        agent_id,
                        &RecordFilter::new()
                            .with_event_type(event_type.clone())
                            .since(since)
                            .active_only(),
                    )
                    .await?,
            );
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        records.truncate(self.config.retrieval.recent_count);

        Ok(records
            .into_iter()
            .map(|record| Candidate {
                body: CandidateBody::Record(record),
                protected: false,
                similarity: None,
            })
            .collect())
    }

    /// Source C: nearest neighbors of the query text
    async fn semantic_source(
        &self,
        agent_id: &str,
        query: &RetrievalQuery,
    ) -> Result<Vec<Candidate>> {
        if query.text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let hits = self
            .search
            .query(
                &collection_for_agent(agent_id),
                &query.text,
                self.config.retrieval.semantic_top_k,
                query.min_importance,
            )
            .await?;

        let mut candidates = Vec::with_capacity(hits.len());
        for hit in hits {
            // The index can lag behind deletes; drop hits whose record is gone
            let Some(record) = self.storage.get(agent_id, hit.id).await? else {
                tracing::debug!(agent_id, id = %hit.id, "search hit without backing record");
                continue;
            };
            let similarity = hit.similarity();
            candidates.push(Candidate {
                body: CandidateBody::Record(record),
                protected: false,
                similarity: Some(similarity),
            });
        }
        Ok(candidates)
    }
}
