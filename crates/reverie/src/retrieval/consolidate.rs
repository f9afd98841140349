//! Periodic consolidation of stale low-value records
//!
//! Folds old Regular-tier conversational records into a single Important
//! summary carrying the aggregated topic list and count, then deletes the
//! originals. Below the minimum count nothing happens. Scheduling is the
//! caller's concern; this job only does one pass when asked.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::record::{AttrKey, AttrValue, MemoryRecord, Tier};
use crate::store::{MemoryStore, RecordFilter};

/// Event type of records eligible for consolidation
const CONVERSATION: &str = "conversation";
/// Event type of the summary records this job produces
const SUMMARY_EVENT: &str = "conversation_summary";

/// Result of one consolidation pass
#[derive(Debug, Clone, Default)]
pub struct ConsolidationResult {
    /// How many records were folded away
    pub consolidated: usize,
    /// Id of the new summary record, when one was created
    pub summary_id: Option<Uuid>,
}

/// Compacts stale conversational records into summaries
pub struct ConsolidationJob {
    store: Arc<MemoryStore>,
}

impl ConsolidationJob {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Consolidate Regular-tier conversational records older than `age_days`
    /// for one agent, if at least `min_count` qualify.
    pub async fn consolidate(
        &self,
        agent_id: &str,
        age_days: i64,
        min_count: usize,
    ) -> Result<ConsolidationResult> {
        let cutoff = Utc::now() - Duration::days(age_days);
        let stale = self
            .store
            .find(
                agent_id,
                &RecordFilter::new()
                    .with_event_type(CONVERSATION)
                    .with_tier(Tier::Regular)
                    .before(cutoff),
            )
            .await?;

        if stale.len() < min_count.max(1) {
            tracing::debug!(
                agent_id,
                stale = stale.len(),
                min_count,
                "skipping consolidation, not enough stale records"
            );
            return Ok(ConsolidationResult::default());
        }

        let summary = build_summary(agent_id, &stale);
        let summary_id = self.store.store(summary).await?.id();
        for record in &stale {
            self.store.delete(agent_id, record.id).await?;
        }
        tracing::debug!(
            agent_id,
            consolidated = stale.len(),
            summary = %summary_id,
            "consolidated stale conversations"
        );
        Ok(ConsolidationResult {
            consolidated: stale.len(),
            summary_id: Some(summary_id),
        })
    }
}

fn build_summary(agent_id: &str, stale: &[MemoryRecord]) -> MemoryRecord {
    let topics: BTreeSet<String> = stale
        .iter()
        .flat_map(|r| r.topics().iter().cloned())
        .collect();
    let topic_list: Vec<String> = topics.into_iter().collect();
    let importance = stale.iter().map(|r| r.importance).max().unwrap_or(5);

    let text = if topic_list.is_empty() {
        format!("We have had {} earlier conversations.", stale.len())
    } else {
        format!(
            "We have had {} earlier conversations, mostly about {}.",
            stale.len(),
            topic_list.join(", ")
        )
    };

    let mut attrs = std::collections::BTreeMap::new();
    if !topic_list.is_empty() {
        attrs.insert(AttrKey::Topics, AttrValue::List(topic_list));
    }
    attrs.insert(
        AttrKey::Custom("consolidated_count".to_string()),
        AttrValue::Int(stale.len() as i64),
    );

    MemoryRecord {
        id: Uuid::new_v4(),
        agent_id: agent_id.to_string(),
        full_text: text.clone(),
        short_text: text,
        event_type: SUMMARY_EVENT.to_string(),
        importance,
        tier: Tier::Important,
        emotion: None,
        created_at: Utc::now(),
        is_milestone: false,
        milestone_type: None,
        slot: None,
        superseded_by: None,
        attrs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::search::InMemorySearch;
    use crate::store::InMemoryStorage;
    use crate::testing::record_builder;
    use crate::validate::AcceptAll;

    fn job() -> (Arc<MemoryStore>, ConsolidationJob) {
        let store = Arc::new(MemoryStore::new(
            Arc::new(MemoryConfig::default()),
            Arc::new(InMemoryStorage::new()),
            Arc::new(InMemorySearch::new()),
            Arc::new(AcceptAll),
        ));
        (store.clone(), ConsolidationJob::new(store))
    }

    #[tokio::test]
    async fn test_below_min_count_is_noop() {
        let (store, job) = job();
        for i in 0..3 {
            store
                .store(
                    record_builder("npc", "conversation")
                        .full_text(format!("old chat {i}"))
                        .age_days(20)
                        .build(),
                )
                .await
                .unwrap();
        }

        let result = job.consolidate("npc", 7, 5).await.unwrap();
        assert_eq!(result.consolidated, 0);
        assert!(result.summary_id.is_none());
        assert_eq!(
            store.get_by_event_type("npc", "conversation").await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_consolidates_stale_regulars() {
        let (store, job) = job();
        for i in 0..5 {
            store
                .store(
                    record_builder("npc", "conversation")
                        .full_text(format!("old chat about weather {i}"))
                        .topics(&["weather", "crops"])
                        .age_days(20)
                        .build(),
                )
                .await
                .unwrap();
        }
        // Fresh record stays out of the fold
        store
            .store(
                record_builder("npc", "conversation")
                    .full_text("chatted this morning")
                    .build(),
            )
            .await
            .unwrap();

        let result = job.consolidate("npc", 7, 5).await.unwrap();
        assert_eq!(result.consolidated, 5);

        let remaining = store.get_by_event_type("npc", "conversation").await.unwrap();
        assert_eq!(remaining.len(), 1);

        let summary = store
            .get("npc", result.summary_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.tier, Tier::Important);
        assert!(summary.full_text.contains("5 earlier conversations"));
        assert!(summary.full_text.contains("crops, weather"));
    }

    #[tokio::test]
    async fn test_pinned_and_important_untouched() {
        let (store, job) = job();
        store
            .store(
                record_builder("npc", "first_meeting")
                    .tier(Tier::Pinned)
                    .milestone("first_meeting")
                    .age_days(30)
                    .build(),
            )
            .await
            .unwrap();
        for i in 0..5 {
            store
                .store(
                    record_builder("npc", "conversation")
                        .full_text(format!("old chat {i}"))
                        .age_days(20)
                        .build(),
                )
                .await
                .unwrap();
        }

        let result = job.consolidate("npc", 7, 5).await.unwrap();
        assert_eq!(result.consolidated, 5);
        let pinned = store.get_by_event_type("npc", "first_meeting").await.unwrap();
        assert_eq!(pinned.len(), 1);
        assert_eq!(pinned[0].tier, Tier::Pinned);
    }
}
