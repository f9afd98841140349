//! The agent-facing record store
//!
//! [`MemoryStore`] is the single write path: it gates text through the
//! content validator, derives short text, applies slot-aware dedup and the
//! conflict-resolution rules, persists the record, and keeps the search
//! index in step. Reads are thin wrappers over the storage filter API.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::record::{MemoryRecord, derive_short_text};
use crate::search::{SearchMetadata, SemanticSearch, collection_for_agent};
use crate::store::{ConflictResolver, RecordFilter, RecordStorage};
use crate::validate::ContentValidator;

/// Outcome of a successful store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// A new record was persisted
    Stored(Uuid),
    /// An identical active slot value already existed; nothing was written
    Unchanged(Uuid),
}

impl StoreOutcome {
    /// Id of the record now holding the value
    pub fn id(&self) -> Uuid {
        match self {
            StoreOutcome::Stored(id) | StoreOutcome::Unchanged(id) => *id,
        }
    }
}

/// Durable per-agent record persistence with dedup and write-time validation
pub struct MemoryStore {
    config: Arc<MemoryConfig>,
    storage: Arc<dyn RecordStorage>,
    search: Arc<dyn SemanticSearch>,
    validator: Arc<dyn ContentValidator>,
    resolver: ConflictResolver,
}

impl MemoryStore {
    pub fn new(
        config: Arc<MemoryConfig>,
        storage: Arc<dyn RecordStorage>,
        search: Arc<dyn SemanticSearch>,
        validator: Arc<dyn ContentValidator>,
    ) -> Self {
        let resolver = ConflictResolver::new(storage.clone(), search.clone());
        Self {
            config,
            storage,
            search,
            validator,
            resolver,
        }
    }

    /// Validate, reconcile, and persist one record.
    ///
    /// Returns [`StoreOutcome::Unchanged`] when an identical active slot
    /// value already exists. A validator rejection without sanitized
    /// replacement text surfaces as [`MemoryError::ValidationRejected`] and
    /// nothing is written.
    pub async fn store(&self, mut record: MemoryRecord) -> Result<StoreOutcome> {
        if record.full_text.trim().is_empty() {
            return Err(MemoryError::InvalidRecord(
                "full_text is required".to_string(),
            ));
        }

        let verdict = self
            .validator
            .validate(&record.full_text, &record.agent_id)
            .await?;
        if !verdict.valid {
            match verdict.sanitized_text {
                Some(sanitized) => {
                    tracing::debug!(
                        agent_id = record.agent_id,
                        issues = ?verdict.issues,
                        "storing sanitized replacement text"
                    );
                    record.full_text = sanitized;
                }
                None => {
                    return Err(MemoryError::ValidationRejected(verdict.issues.join("; ")));
                }
            }
        }

        record.short_text = derive_short_text(&record.full_text, self.config.short_text_max_chars);

        if !self
            .config
            .events
            .interaction_types
            .contains(&record.event_type)
        {
            tracing::debug!(
                agent_id = record.agent_id,
                event_type = record.event_type,
                "storing record with unlisted interaction type"
            );
        }

        // Slot-aware dedup: identical active value is an idempotent no-op,
        // a differing value is an implicit update through slot replacement.
        if let Some(slot) = record.slot.clone() {
            if let Some(existing) = self.get_by_slot(&record.agent_id, &slot).await? {
                if existing.full_text == record.full_text {
                    tracing::debug!(
                        agent_id = record.agent_id,
                        slot,
                        id = %existing.id,
                        "identical slot value already stored"
                    );
                    return Ok(StoreOutcome::Unchanged(existing.id));
                }
            }
            self.resolver.replace_slot(&record.agent_id, &slot).await?;
        }

        self.resolver
            .apply_supersession(&self.config, &record)
            .await?;

        self.storage.put(&record).await?;
        tracing::debug!(
            agent_id = record.agent_id,
            id = %record.id,
            event_type = record.event_type,
            tier = %record.tier,
            "stored record"
        );

        // Index short text for the semantic source. The record is already
        // durable; protected and recent sources still surface it if the
        // index write fails.
        let collection = collection_for_agent(&record.agent_id);
        let metadata = SearchMetadata {
            agent_id: record.agent_id.clone(),
            event_type: record.event_type.clone(),
            importance: record.importance,
        };
        let indexed = async {
            self.search.create_collection(&collection).await?;
            self.search
                .add(&collection, record.id, &record.short_text, &metadata)
                .await
        };
        if let Err(err) = indexed.await {
            tracing::warn!(agent_id = record.agent_id, id = %record.id, %err,
                "record stored but not indexed for semantic search");
        }

        Ok(StoreOutcome::Stored(record.id))
    }

    /// Fetch a record by id
    pub async fn get(&self, agent_id: &str, id: Uuid) -> Result<Option<MemoryRecord>> {
        self.storage.get(agent_id, id).await
    }

    /// The active record holding `slot`, if any
    pub async fn get_by_slot(&self, agent_id: &str, slot: &str) -> Result<Option<MemoryRecord>> {
        let mut records = self
            .storage
            .find(
                agent_id,
                &RecordFilter::new().with_slot(slot).active_only(),
            )
            .await?;
        Ok(records.pop())
    }

    /// All records of one event type, newest first
    pub async fn get_by_event_type(
        &self,
        agent_id: &str,
        event_type: &str,
    ) -> Result<Vec<MemoryRecord>> {
        let mut records = self
            .storage
            .find(
                agent_id,
                &RecordFilter::new().with_event_type(event_type),
            )
            .await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    /// All of an agent's records matching `filter`
    pub async fn find(&self, agent_id: &str, filter: &RecordFilter) -> Result<Vec<MemoryRecord>> {
        self.storage.find(agent_id, filter).await
    }

    /// Delete a record and its search index entry
    pub async fn delete(&self, agent_id: &str, id: Uuid) -> Result<()> {
        if !self.storage.delete(agent_id, id).await? {
            return Err(MemoryError::RecordNotFound(id));
        }
        if let Err(err) = self.search.remove(&collection_for_agent(agent_id), id).await {
            tracing::warn!(agent_id, %id, %err, "failed to unindex deleted record");
        }
        tracing::debug!(agent_id, %id, "deleted record");
        Ok(())
    }

    pub(crate) fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::InMemorySearch;
    use crate::store::InMemoryStorage;
    use crate::testing::{RejectingValidator, SanitizingValidator, record_builder};
    use crate::validate::AcceptAll;

    fn store_with_validator(validator: Arc<dyn ContentValidator>) -> (Arc<InMemoryStorage>, MemoryStore) {
        let config = Arc::new(MemoryConfig::default());
        let storage = Arc::new(InMemoryStorage::new());
        let search = Arc::new(InMemorySearch::new());
        let store = MemoryStore::new(config, storage.clone(), search, validator);
        (storage, store)
    }

    fn store() -> (Arc<InMemoryStorage>, MemoryStore) {
        store_with_validator(Arc::new(AcceptAll))
    }

    #[tokio::test]
    async fn test_store_requires_full_text() {
        let (_, store) = store();
        let record = record_builder("npc", "conversation").full_text("  ").build();
        assert!(matches!(
            store.store(record).await,
            Err(MemoryError::InvalidRecord(_))
        ));
    }

    #[tokio::test]
    async fn test_store_derives_short_text() {
        let (storage, store) = store();
        let long = "a ".repeat(120) + "end.";
        let record = record_builder("npc", "conversation").full_text(&long).build();
        let outcome = store.store(record).await.unwrap();

        let stored = storage.get("npc", outcome.id()).await.unwrap().unwrap();
        assert!(stored.short_text.chars().count() <= 153);
    }

    #[tokio::test]
    async fn test_rejection_blocks_write() {
        let (storage, store) =
            store_with_validator(Arc::new(RejectingValidator::new("breaks persona")));
        let record = record_builder("npc", "conversation").build();
        assert!(matches!(
            store.store(record).await,
            Err(MemoryError::ValidationRejected(_))
        ));
        assert_eq!(storage.len("npc"), 0);
    }

    #[tokio::test]
    async fn test_sanitized_replacement_is_stored() {
        let (storage, store) =
            store_with_validator(Arc::new(SanitizingValidator::new("A calmer retelling.")));
        let record = record_builder("npc", "conversation")
            .full_text("Something unacceptable.")
            .build();
        let outcome = store.store(record).await.unwrap();

        let stored = storage.get("npc", outcome.id()).await.unwrap().unwrap();
        assert_eq!(stored.full_text, "A calmer retelling.");
    }

    #[tokio::test]
    async fn test_identical_slot_value_is_idempotent() {
        let (storage, store) = store();
        let first = record_builder("npc", "identity")
            .slot("player_name")
            .full_text("The player is called Alex.")
            .build();
        let first_id = store.store(first).await.unwrap().id();

        let duplicate = record_builder("npc", "identity")
            .slot("player_name")
            .full_text("The player is called Alex.")
            .build();
        let outcome = store.store(duplicate).await.unwrap();

        assert_eq!(outcome, StoreOutcome::Unchanged(first_id));
        assert_eq!(storage.len("npc"), 1);
    }

    #[tokio::test]
    async fn test_differing_slot_value_replaces() {
        let (storage, store) = store();
        let first = record_builder("npc", "identity")
            .slot("player_name")
            .full_text("The player is called Alex.")
            .build();
        store.store(first).await.unwrap();

        let update = record_builder("npc", "identity")
            .slot("player_name")
            .full_text("The player is called Alexandra.")
            .build();
        store.store(update).await.unwrap();

        assert_eq!(storage.len("npc"), 1);
        let current = store.get_by_slot("npc", "player_name").await.unwrap().unwrap();
        assert_eq!(current.full_text, "The player is called Alexandra.");
    }

    #[tokio::test]
    async fn test_supersession_applied_on_store() {
        let (_, store) = store();
        let promise = record_builder("npc", "promise_made")
            .full_text("Promised to return the locket.")
            .build();
        let promise_id = store.store(promise).await.unwrap().id();

        let broken = record_builder("npc", "promise_broken")
            .full_text("Sold the locket at market.")
            .build();
        let broken_id = store.store(broken).await.unwrap().id();

        let prior = store.get("npc", promise_id).await.unwrap().unwrap();
        assert_eq!(prior.superseded_by, Some(broken_id));
    }

    #[tokio::test]
    async fn test_delete_missing_record_errors() {
        let (_, store) = store();
        let err = store.delete("npc", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, MemoryError::RecordNotFound(_)));
    }
}
