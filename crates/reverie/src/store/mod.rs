//! Record persistence
//!
//! [`RecordStorage`] is the contract the durable persistence collaborator
//! must satisfy; [`InMemoryStorage`] implements the identical contract for
//! offline and test use. [`MemoryStore`] layers validation, dedup, and
//! conflict resolution on top of whichever backend is injected.

pub mod conflict;
pub mod memory;
pub mod records;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::record::{MemoryRecord, Tier};

pub use conflict::ConflictResolver;
pub use memory::InMemoryStorage;
pub use records::{MemoryStore, StoreOutcome};

/// Read/write contract for the persistence collaborator.
///
/// Backends are keyed by (agent, record id). `put` upserts; `find` applies
/// a [`RecordFilter`] with AND semantics across its criteria.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Insert or replace a record
    async fn put(&self, record: &MemoryRecord) -> Result<()>;

    /// Fetch a record by id
    async fn get(&self, agent_id: &str, id: Uuid) -> Result<Option<MemoryRecord>>;

    /// Remove a record; returns whether it existed
    async fn delete(&self, agent_id: &str, id: Uuid) -> Result<bool>;

    /// Fetch all of an agent's records matching the filter, unordered
    async fn find(&self, agent_id: &str, filter: &RecordFilter) -> Result<Vec<MemoryRecord>>;
}

/// Filter criteria for record lookups.
///
/// All fields are optional; when `None`, that criterion is not applied.
/// Multiple criteria combine with AND logic.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Match a specific slot name
    pub slot: Option<String>,
    /// Match a specific event type
    pub event_type: Option<String>,
    /// Match a specific tier
    pub tier: Option<Tier>,
    /// Only records created at or after this time
    pub since: Option<DateTime<Utc>>,
    /// Only records created strictly before this time
    pub before: Option<DateTime<Utc>>,
    /// `Some(true)` matches only active records, `Some(false)` only superseded
    pub active: Option<bool>,
}

impl RecordFilter {
    /// Create an empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by slot name
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    /// Filter by event type
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Filter by tier
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Only records created at or after `since`
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Only records created strictly before `before`
    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    /// Only active (non-superseded) records
    pub fn active_only(mut self) -> Self {
        self.active = Some(true);
        self
    }

    /// Whether a record satisfies every set criterion
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(ref slot) = self.slot {
            if record.slot.as_deref() != Some(slot.as_str()) {
                return false;
            }
        }
        if let Some(ref event_type) = self.event_type {
            if record.event_type != *event_type {
                return false;
            }
        }
        if let Some(tier) = self.tier {
            if record.tier != tier {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(before) = self.before {
            if record.created_at >= before {
                return false;
            }
        }
        if let Some(active) = self.active {
            if record.is_active() != active {
                return false;
            }
        }
        true
    }

    /// Check if this filter is empty (no criteria set)
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
            && self.event_type.is_none()
            && self.tier.is_none()
            && self.since.is_none()
            && self.before.is_none()
            && self.active.is_none()
    }
}
