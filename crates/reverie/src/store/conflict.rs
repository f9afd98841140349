//! Write-time conflict resolution
//!
//! Two reconciliation rules keep an agent's record set coherent:
//!
//! - **Slot replacement** — a slot holds the current value, not a history.
//!   Writing slot S deletes any existing active record for (agent, S).
//! - **Supersession chains** — contradicting/updating event types (config:
//!   superseding → superseded) mark prior records instead of deleting them.
//!   Superseded text stays queryable; only its score is discounted later.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::record::MemoryRecord;
use crate::search::{SemanticSearch, collection_for_agent};
use crate::store::{RecordFilter, RecordStorage};

/// Applies slot-replacement and supersession rules against a backend
pub struct ConflictResolver {
    storage: Arc<dyn RecordStorage>,
    search: Arc<dyn SemanticSearch>,
}

impl ConflictResolver {
    pub fn new(storage: Arc<dyn RecordStorage>, search: Arc<dyn SemanticSearch>) -> Self {
        Self { storage, search }
    }

    /// Delete the active record currently holding `slot` for this agent,
    /// returning its id if one existed. The deleted record is also removed
    /// from the search index; an index failure is logged, not fatal.
    pub async fn replace_slot(&self, agent_id: &str, slot: &str) -> Result<Option<Uuid>> {
        let existing = self
            .storage
            .find(
                agent_id,
                &RecordFilter::new().with_slot(slot).active_only(),
            )
            .await?;

        let mut replaced = None;
        for record in existing {
            self.storage.delete(agent_id, record.id).await?;
            if let Err(err) = self
                .search
                .remove(&collection_for_agent(agent_id), record.id)
                .await
            {
                tracing::warn!(agent_id, slot, %err, "failed to unindex replaced slot record");
            }
            tracing::debug!(agent_id, slot, id = %record.id, "replaced slot record");
            replaced = Some(record.id);
        }
        Ok(replaced)
    }

    /// Mark all prior active records of the event type superseded by
    /// `record.event_type`, if the config declares such a pair. Returns how
    /// many records were marked.
    pub async fn apply_supersession(
        &self,
        config: &MemoryConfig,
        record: &MemoryRecord,
    ) -> Result<usize> {
        let Some(superseded_type) = config.events.supersession_pairs.get(&record.event_type)
        else {
            return Ok(0);
        };

        let priors = self
            .storage
            .find(
                &record.agent_id,
                &RecordFilter::new()
                    .with_event_type(superseded_type.clone())
                    .active_only(),
            )
            .await?;

        let mut marked = 0;
        for mut prior in priors {
            prior.superseded_by = Some(record.id);
            self.storage.put(&prior).await?;
            tracing::debug!(
                agent_id = record.agent_id,
                superseding = record.event_type,
                superseded = %superseded_type,
                prior_id = %prior.id,
                "marked record superseded"
            );
            marked += 1;
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::InMemorySearch;
    use crate::store::InMemoryStorage;
    use crate::testing::record_builder;

    fn resolver() -> (Arc<InMemoryStorage>, ConflictResolver) {
        let storage = Arc::new(InMemoryStorage::new());
        let search = Arc::new(InMemorySearch::new());
        let resolver = ConflictResolver::new(storage.clone(), search);
        (storage, resolver)
    }

    #[tokio::test]
    async fn test_replace_slot_deletes_prior() {
        let (storage, resolver) = resolver();
        let prior = record_builder("npc", "identity")
            .slot("player_name")
            .full_text("The player is called Alex.")
            .build();
        storage.put(&prior).await.unwrap();

        let replaced = resolver.replace_slot("npc", "player_name").await.unwrap();
        assert_eq!(replaced, Some(prior.id));
        assert!(storage.get("npc", prior.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_slot_without_prior_is_noop() {
        let (_, resolver) = resolver();
        let replaced = resolver.replace_slot("npc", "player_name").await.unwrap();
        assert!(replaced.is_none());
    }

    #[tokio::test]
    async fn test_supersession_marks_but_keeps_prior() {
        let (storage, resolver) = resolver();
        let config = MemoryConfig::default();
        let promise = record_builder("npc", "promise_made")
            .full_text("Promised to guard the caravan.")
            .build();
        storage.put(&promise).await.unwrap();

        let broken = record_builder("npc", "promise_broken")
            .full_text("Abandoned the caravan at the ford.")
            .build();
        let marked = resolver.apply_supersession(&config, &broken).await.unwrap();
        assert_eq!(marked, 1);

        let prior = storage.get("npc", promise.id).await.unwrap().unwrap();
        assert_eq!(prior.superseded_by, Some(broken.id));
        assert_eq!(prior.full_text, "Promised to guard the caravan.");
    }

    #[tokio::test]
    async fn test_unrelated_event_supersedes_nothing() {
        let (storage, resolver) = resolver();
        let config = MemoryConfig::default();
        let promise = record_builder("npc", "promise_made").build();
        storage.put(&promise).await.unwrap();

        let chat = record_builder("npc", "conversation").build();
        let marked = resolver.apply_supersession(&config, &chat).await.unwrap();
        assert_eq!(marked, 0);
        assert!(storage.get("npc", promise.id).await.unwrap().unwrap().is_active());
    }

    #[tokio::test]
    async fn test_already_superseded_records_not_remarked() {
        let (storage, resolver) = resolver();
        let config = MemoryConfig::default();
        let first_breaker = Uuid::new_v4();
        let promise = record_builder("npc", "promise_made")
            .superseded_by(first_breaker)
            .build();
        storage.put(&promise).await.unwrap();

        let broken = record_builder("npc", "promise_broken").build();
        let marked = resolver.apply_supersession(&config, &broken).await.unwrap();
        assert_eq!(marked, 0);
        let prior = storage.get("npc", promise.id).await.unwrap().unwrap();
        assert_eq!(prior.superseded_by, Some(first_breaker));
    }
}
