//! The memory engine facade
//!
//! Wires the write path (classify → validate → reconcile → persist) and the
//! read path (collect → score → budget → render) behind one type. All
//! collaborators are injected at construction; the engine holds no ambient
//! global state. Writes for one agent are serialized through a per-agent
//! lock so slot-uniqueness and supersession invariants hold; writes across
//! agents and all reads proceed concurrently.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::record::{
    AttrKey, AttrValue, EventInput, MemoryRecord, RelationshipState, RetrievalQuery, classify,
};
use crate::retrieval::{
    BudgetAllocator, BudgetResult, CandidateCollector, ConsolidationJob, ConsolidationResult,
    ScoringEngine,
};
use crate::search::SemanticSearch;
use crate::store::{MemoryStore, RecordStorage, StoreOutcome};
use crate::validate::ContentValidator;

/// Retrieval output grouped by inclusion strength
#[derive(Debug, Clone, Default)]
pub struct TieredMemories {
    /// Protected candidates: header, protected slots, pinned records
    pub pinned: Vec<String>,
    /// Important-tier selections
    pub important: Vec<String>,
    /// Everything else that made the budget
    pub relevant: Vec<String>,
    /// Total rendered characters across all three groups
    pub total_chars: usize,
}

/// Per-agent long-term memory with budgeted retrieval
pub struct MemoryEngine {
    config: Arc<MemoryConfig>,
    store: Arc<MemoryStore>,
    collector: CandidateCollector,
    scorer: ScoringEngine,
    allocator: BudgetAllocator,
    consolidation: ConsolidationJob,
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MemoryEngine {
    /// Build an engine over injected collaborators. Fails fast on a
    /// malformed configuration.
    pub fn new(
        config: MemoryConfig,
        storage: Arc<dyn RecordStorage>,
        search: Arc<dyn SemanticSearch>,
        validator: Arc<dyn ContentValidator>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let store = Arc::new(MemoryStore::new(
            config.clone(),
            storage.clone(),
            search.clone(),
            validator,
        ));
        Ok(Self {
            collector: CandidateCollector::new(config.clone(), storage, search),
            scorer: ScoringEngine::new(config.clone()),
            allocator: BudgetAllocator::new(config.clone()),
            consolidation: ConsolidationJob::new(store.clone()),
            config,
            store,
            write_locks: DashMap::new(),
        })
    }

    fn write_lock(&self, agent_id: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(agent_id.to_string())
            .or_default()
            .clone()
    }

    /// Classify and store one experience for an agent.
    pub async fn record_event(&self, agent_id: &str, input: EventInput) -> Result<StoreOutcome> {
        let lock = self.write_lock(agent_id);
        let _guard = lock.lock().await;

        let classification = classify(
            &self.config,
            &input.event_type,
            input.importance,
            input.explicit_tier,
            input.explicit_milestone.as_deref(),
            input.first_occurrence,
        );

        let mut attrs = input.attrs;
        let clamped = match attrs.get(&AttrKey::DimensionDelta) {
            Some(AttrValue::Delta(delta)) => Some(delta.clamped(&self.config)),
            _ => None,
        };
        if let Some(delta) = clamped {
            attrs.insert(AttrKey::DimensionDelta, AttrValue::Delta(delta));
        }

        let record = MemoryRecord {
            id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            full_text: input.full_text,
            short_text: String::new(),
            event_type: input.event_type,
            importance: input.importance.clamp(1, 10),
            tier: classification.tier,
            emotion: input.emotion,
            created_at: Utc::now(),
            is_milestone: classification.is_milestone(),
            milestone_type: classification.milestone_type,
            slot: input.slot,
            superseded_by: None,
            attrs,
        };

        self.store.store(record).await
    }

    /// Budgeted, score-ordered retrieval for one dialogue turn.
    pub async fn retrieve_scored(
        &self,
        agent_id: &str,
        state: &RelationshipState,
        query: &RetrievalQuery,
    ) -> Result<Vec<String>> {
        let result = self.run_pipeline(agent_id, state, query).await?;
        Ok(result.selected.into_iter().map(|r| r.text).collect())
    }

    /// Retrieval grouped into pinned / important / relevant blocks.
    pub async fn retrieve_tiered(
        &self,
        agent_id: &str,
        state: &RelationshipState,
        query: &RetrievalQuery,
    ) -> Result<TieredMemories> {
        let result = self.run_pipeline(agent_id, state, query).await?;
        let mut tiered = TieredMemories::default();
        for rendered in result.selected {
            tiered.total_chars += rendered.text.chars().count();
            match (rendered.protected, rendered.tier) {
                (true, _) | (_, Some(crate::record::Tier::Pinned)) => {
                    tiered.pinned.push(rendered.text)
                }
                (_, Some(crate::record::Tier::Important)) => tiered.important.push(rendered.text),
                _ => tiered.relevant.push(rendered.text),
            }
        }
        Ok(tiered)
    }

    async fn run_pipeline(
        &self,
        agent_id: &str,
        state: &RelationshipState,
        query: &RetrievalQuery,
    ) -> Result<BudgetResult> {
        let candidates = self.collector.collect(agent_id, state, query).await?;
        let ranked = self.scorer.rank(candidates, Utc::now());
        let budget = query
            .budget_units
            .unwrap_or(self.config.retrieval.budget_units);
        Ok(self.allocator.fill_budget(&ranked, budget))
    }

    /// Fold stale conversational records for one agent into a summary.
    pub async fn consolidate(
        &self,
        agent_id: &str,
        age_days: i64,
        min_count: usize,
    ) -> Result<ConsolidationResult> {
        let lock = self.write_lock(agent_id);
        let _guard = lock.lock().await;
        self.consolidation
            .consolidate(agent_id, age_days, min_count)
            .await
    }

    /// Delete one record and its index entry.
    pub async fn delete_record(&self, agent_id: &str, id: Uuid) -> Result<()> {
        let lock = self.write_lock(agent_id);
        let _guard = lock.lock().await;
        self.store.delete(agent_id, id).await
    }

    /// Fetch one record by id.
    pub async fn get_record(&self, agent_id: &str, id: Uuid) -> Result<Option<MemoryRecord>> {
        self.store.get(agent_id, id).await
    }

    /// Current text of a slot, for this or another agent. Cross-agent reads
    /// are allowed; cross-agent writes are not part of the API.
    pub async fn slot_value(&self, agent_id: &str, slot: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get_by_slot(agent_id, slot)
            .await?
            .map(|record| record.full_text))
    }
}
