//! Test utilities — builders and deterministic collaborator doubles
//!
//! Shared by the unit tests in each module and the integration suites under
//! `tests/`. Everything here is deterministic; nothing reaches the network.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::record::{AttrKey, AttrValue, MemoryRecord, Tier};
use crate::retrieval::{Candidate, CandidateBody};
use crate::search::{SearchHit, SearchMetadata, SemanticSearch, collection_for_agent};
use crate::store::{RecordFilter, RecordStorage};
use crate::validate::{ContentValidator, Validation};

/// Builder for test records with sensible defaults
pub struct RecordBuilder {
    record: MemoryRecord,
}

/// Start building a record for `agent_id` with the given event type
pub fn record_builder(agent_id: &str, event_type: &str) -> RecordBuilder {
    let text = format!("A {event_type} the agent remembers.");
    RecordBuilder {
        record: MemoryRecord {
            id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            full_text: text.clone(),
            short_text: text,
            event_type: event_type.to_string(),
            importance: 5,
            tier: Tier::Regular,
            emotion: None,
            created_at: Utc::now(),
            is_milestone: false,
            milestone_type: None,
            slot: None,
            superseded_by: None,
            attrs: BTreeMap::new(),
        },
    }
}

impl RecordBuilder {
    pub fn full_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.record.full_text = text.clone();
        self.record.short_text = text;
        self
    }

    pub fn short_text(mut self, text: impl Into<String>) -> Self {
        self.record.short_text = text.into();
        self
    }

    pub fn importance(mut self, importance: u8) -> Self {
        self.record.importance = importance;
        self
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.record.tier = tier;
        self
    }

    pub fn emotion(mut self, emotion: impl Into<String>) -> Self {
        self.record.emotion = Some(emotion.into());
        self
    }

    pub fn slot(mut self, slot: impl Into<String>) -> Self {
        self.record.slot = Some(slot.into());
        self
    }

    pub fn milestone(mut self, label: impl Into<String>) -> Self {
        self.record.is_milestone = true;
        self.record.milestone_type = Some(label.into());
        self
    }

    pub fn age_days(mut self, days: i64) -> Self {
        self.record.created_at = Utc::now() - Duration::days(days);
        self
    }

    pub fn superseded_by(mut self, id: Uuid) -> Self {
        self.record.superseded_by = Some(id);
        self
    }

    pub fn topics(mut self, topics: &[&str]) -> Self {
        self.record.attrs.insert(
            AttrKey::Topics,
            AttrValue::List(topics.iter().map(|t| t.to_string()).collect()),
        );
        self
    }

    pub fn build(self) -> MemoryRecord {
        self.record
    }
}

/// Wrap a record as a plain, non-protected candidate
pub fn candidate_from(record: MemoryRecord) -> Candidate {
    Candidate {
        body: CandidateBody::Record(record),
        protected: false,
        similarity: None,
    }
}

/// Index a record's short text into the agent's collection the way the
/// store does on write
pub async fn index_record(search: &dyn SemanticSearch, record: &MemoryRecord) {
    let collection = collection_for_agent(&record.agent_id);
    search
        .create_collection(&collection)
        .await
        .expect("create collection");
    search
        .add(
            &collection,
            record.id,
            &record.short_text,
            &SearchMetadata {
                agent_id: record.agent_id.clone(),
                event_type: record.event_type.clone(),
                importance: record.importance,
            },
        )
        .await
        .expect("index record");
}

/// Validator that rejects every write with a fixed issue
#[derive(Debug, Clone)]
pub struct RejectingValidator {
    issue: String,
}

impl RejectingValidator {
    pub fn new(issue: impl Into<String>) -> Self {
        Self { issue: issue.into() }
    }
}

#[async_trait]
impl ContentValidator for RejectingValidator {
    async fn validate(&self, _text: &str, _agent_id: &str) -> Result<Validation> {
        Ok(Validation::rejected(vec![self.issue.clone()]))
    }
}

/// Validator that rejects but substitutes fixed sanitized text
#[derive(Debug, Clone)]
pub struct SanitizingValidator {
    replacement: String,
}

impl SanitizingValidator {
    pub fn new(replacement: impl Into<String>) -> Self {
        Self {
            replacement: replacement.into(),
        }
    }
}

#[async_trait]
impl ContentValidator for SanitizingValidator {
    async fn validate(&self, _text: &str, _agent_id: &str) -> Result<Validation> {
        Ok(Validation::sanitized(
            vec!["tone".to_string()],
            self.replacement.clone(),
        ))
    }
}

/// Storage backend that fails every call, for degradation tests
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStorage;

#[async_trait]
impl RecordStorage for FailingStorage {
    async fn put(&self, _record: &MemoryRecord) -> Result<()> {
        Err(MemoryError::Storage("backend down".to_string()))
    }

    async fn get(&self, _agent_id: &str, _id: Uuid) -> Result<Option<MemoryRecord>> {
        Err(MemoryError::Storage("backend down".to_string()))
    }

    async fn delete(&self, _agent_id: &str, _id: Uuid) -> Result<bool> {
        Err(MemoryError::Storage("backend down".to_string()))
    }

    async fn find(&self, _agent_id: &str, _filter: &RecordFilter) -> Result<Vec<MemoryRecord>> {
        Err(MemoryError::Storage("backend down".to_string()))
    }
}

/// Search backend that fails every call, for degradation tests
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSearch;

#[async_trait]
impl SemanticSearch for FailingSearch {
    async fn create_collection(&self, _collection: &str) -> Result<()> {
        Err(MemoryError::Search("backend down".to_string()))
    }

    async fn delete_collection(&self, _collection: &str) -> Result<()> {
        Err(MemoryError::Search("backend down".to_string()))
    }

    async fn add(
        &self,
        _collection: &str,
        _id: Uuid,
        _text: &str,
        _metadata: &SearchMetadata,
    ) -> Result<()> {
        Err(MemoryError::Search("backend down".to_string()))
    }

    async fn remove(&self, _collection: &str, _id: Uuid) -> Result<()> {
        Err(MemoryError::Search("backend down".to_string()))
    }

    async fn query(
        &self,
        _collection: &str,
        _text: &str,
        _limit: usize,
        _min_importance: Option<u8>,
    ) -> Result<Vec<SearchHit>> {
        Err(MemoryError::Search("backend down".to_string()))
    }

    async fn count(&self, _collection: &str) -> Result<usize> {
        Err(MemoryError::Search("backend down".to_string()))
    }
}
