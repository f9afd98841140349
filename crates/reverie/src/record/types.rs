//! Core record types
//!
//! Defines the per-agent experience record, its tier classification, the
//! enum-keyed attribute bag that replaces free-form metadata dictionaries,
//! and the read-only relationship state handed in by the calling agent.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MemoryConfig;

/// A single experience record stored for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, unique within an agent
    pub id: Uuid,
    /// Owning agent
    pub agent_id: String,
    /// Complete text of the experience
    pub full_text: String,
    /// Derived compact form, bounded by the configured maximum length
    pub short_text: String,
    /// Open interaction tag ("conversation", "gift_received", ...)
    pub event_type: String,
    /// Importance on a 1..=10 scale
    pub importance: u8,
    /// Priority class governing inclusion strength
    pub tier: Tier,
    /// Dominant emotion felt by the agent, if any
    pub emotion: Option<String>,
    /// When this record was created
    pub created_at: DateTime<Utc>,
    /// Whether this record marks a defining moment
    pub is_milestone: bool,
    /// Milestone label, when `is_milestone` is set
    pub milestone_type: Option<String>,
    /// Slot name for single-value replace-in-place records
    pub slot: Option<String>,
    /// Set when a later, contradicting record superseded this one
    pub superseded_by: Option<Uuid>,
    /// Domain extras (topics, participants, dimension deltas, learned facts)
    #[serde(default)]
    pub attrs: BTreeMap<AttrKey, AttrValue>,
}

impl MemoryRecord {
    /// Whether this record is still active (not superseded)
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }

    /// Age of this record in fractional days, measured from `now`
    pub fn age_days(&self, now: DateTime<Utc>) -> f32 {
        let seconds = (now - self.created_at).num_seconds().max(0) as f32;
        seconds / 86_400.0
    }

    /// Topic list from the attribute bag, empty if absent
    pub fn topics(&self) -> &[String] {
        match self.attrs.get(&AttrKey::Topics) {
            Some(AttrValue::List(topics)) => topics,
            _ => &[],
        }
    }
}

/// Priority class of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// Identity facts and defining milestones; always surfaced
    Pinned,
    /// High-importance experiences
    Important,
    /// Everyday experiences, subject to consolidation
    Regular,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Pinned => write!(f, "Pinned"),
            Tier::Important => write!(f, "Important"),
            Tier::Regular => write!(f, "Regular"),
        }
    }
}

/// Key of the tagged attribute bag.
///
/// Known keys get explicit variants so consumers can match exhaustively;
/// `Custom` carries domain-specific extension fields. Keys serialize as
/// plain strings so the bag stays an ordinary JSON object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AttrKey {
    /// Conversation or event topics
    Topics,
    /// Other characters involved
    Participants,
    /// Relationship dimension changes recorded with the event
    DimensionDelta,
    /// A fact the agent learned from the event
    LearnedFact,
    /// Where the event took place
    Location,
    /// Extension key not covered by a known variant
    Custom(String),
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrKey::Topics => write!(f, "topics"),
            AttrKey::Participants => write!(f, "participants"),
            AttrKey::DimensionDelta => write!(f, "dimension_delta"),
            AttrKey::LearnedFact => write!(f, "learned_fact"),
            AttrKey::Location => write!(f, "location"),
            AttrKey::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl From<AttrKey> for String {
    fn from(key: AttrKey) -> Self {
        key.to_string()
    }
}

impl From<String> for AttrKey {
    fn from(name: String) -> Self {
        match name.as_str() {
            "topics" => AttrKey::Topics,
            "participants" => AttrKey::Participants,
            "dimension_delta" => AttrKey::DimensionDelta,
            "learned_fact" => AttrKey::LearnedFact,
            "location" => AttrKey::Location,
            _ => AttrKey::Custom(name),
        }
    }
}

/// Value of the tagged attribute bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Integer scalar
    Int(i64),
    /// Floating-point scalar
    Float(f64),
    /// Free text
    Text(String),
    /// List of strings
    List(Vec<String>),
    /// Snapshot of relationship dimension changes
    Delta(RelationshipDelta),
}

/// An agent's disposition toward a counterpart across five independent axes.
///
/// Owned and mutated by the calling agent; the engine only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipState {
    /// Trust, -100..=100
    pub trust: f32,
    /// Respect, -100..=100
    pub respect: f32,
    /// Affection, -100..=100
    pub affection: f32,
    /// Fear, -100..=100
    pub fear: f32,
    /// Familiarity, 0..=100
    pub familiarity: f32,
}

impl Default for RelationshipState {
    fn default() -> Self {
        Self {
            trust: 0.0,
            respect: 0.0,
            affection: 0.0,
            fear: 0.0,
            familiarity: 0.0,
        }
    }
}

/// Per-event change to the relationship dimensions, recorded as an attribute
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationshipDelta {
    pub trust: f32,
    pub respect: f32,
    pub affection: f32,
    pub fear: f32,
    pub familiarity: f32,
}

impl RelationshipDelta {
    /// Clamp every axis to the configured delta range
    pub fn clamped(self, config: &MemoryConfig) -> Self {
        let (lo, hi) = config.delta_clamp;
        Self {
            trust: self.trust.clamp(lo, hi),
            respect: self.respect.clamp(lo, hi),
            affection: self.affection.clamp(lo, hi),
            fear: self.fear.clamp(lo, hi),
            familiarity: self.familiarity.clamp(lo, hi),
        }
    }
}

/// Input describing one experience to record for an agent
#[derive(Debug, Clone, Default)]
pub struct EventInput {
    /// Open interaction tag
    pub event_type: String,
    /// Complete text of the experience; required
    pub full_text: String,
    /// Importance on a 1..=10 scale, clamped on classification
    pub importance: u8,
    /// Dominant emotion, if any
    pub emotion: Option<String>,
    /// Slot name for single-value records
    pub slot: Option<String>,
    /// Force a tier instead of deriving one
    pub explicit_tier: Option<Tier>,
    /// Force a milestone label; implies a pinned milestone
    pub explicit_milestone: Option<String>,
    /// Whether this is the first occurrence of a qualifying event type
    pub first_occurrence: bool,
    /// Domain extras
    pub attrs: BTreeMap<AttrKey, AttrValue>,
}

/// A retrieval request for one dialogue turn
#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    /// Free-text query, typically the player's latest utterance
    pub text: String,
    /// Character budget override; `None` uses the configured default
    pub budget_units: Option<usize>,
    /// Minimum importance for semantic candidates
    pub min_importance: Option<u8>,
}

impl RetrievalQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            budget_units: None,
            min_importance: None,
        }
    }

    pub fn with_budget(mut self, budget_units: usize) -> Self {
        self.budget_units = Some(budget_units);
        self
    }

    pub fn with_min_importance(mut self, min_importance: u8) -> Self {
        self.min_importance = Some(min_importance);
        self
    }
}
