//! In-memory persistence backend
//!
//! Implements the [`RecordStorage`] contract over a concurrent map, for
//! offline play and tests. Per-agent record sets are independent; the map is
//! sharded by agent id.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::record::MemoryRecord;
use crate::store::{RecordFilter, RecordStorage};

/// Concurrent in-memory record store, keyed by agent then record id
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    agents: DashMap<String, HashMap<Uuid, MemoryRecord>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records held for one agent
    pub fn len(&self, agent_id: &str) -> usize {
        self.agents.get(agent_id).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, agent_id: &str) -> bool {
        self.len(agent_id) == 0
    }
}

#[async_trait]
impl RecordStorage for InMemoryStorage {
    async fn put(&self, record: &MemoryRecord) -> Result<()> {
        self.agents
            .entry(record.agent_id.clone())
            .or_default()
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, agent_id: &str, id: Uuid) -> Result<Option<MemoryRecord>> {
        Ok(self
            .agents
            .get(agent_id)
            .and_then(|records| records.get(&id).cloned()))
    }

    async fn delete(&self, agent_id: &str, id: Uuid) -> Result<bool> {
        Ok(self
            .agents
            .get_mut(agent_id)
            .map(|mut records| records.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn find(&self, agent_id: &str, filter: &RecordFilter) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .agents
            .get(agent_id)
            .map(|records| {
                records
                    .values()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
