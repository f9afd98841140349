//! Engine configuration
//!
//! One immutable [`MemoryConfig`] per agent (or process) holds every tunable
//! the retrieval and write paths consult: tier weights, decay parameters,
//! candidate source caps, the character budget, and the event vocabularies
//! that drive classification and conflict resolution. Malformed values fail
//! fast at load time via [`MemoryConfig::validate`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::error::{MemoryError, Result};

/// Main configuration structure for the memory engine
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Scoring weights and decay parameters
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Candidate collection limits
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Event vocabularies driving classification and conflict resolution
    #[serde(default)]
    pub events: EventConfig,
    /// Slots that are always included in retrieval output
    #[serde(default = "default_protected_slots")]
    pub protected_slots: Vec<String>,
    /// Maximum length of derived short text, in characters
    #[serde(default = "default_short_text_max_chars")]
    pub short_text_max_chars: usize,
    /// Clamp range applied to relationship dimension deltas
    #[serde(default = "default_delta_clamp")]
    pub delta_clamp: (f32, f32),
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            retrieval: RetrievalConfig::default(),
            events: EventConfig::default(),
            protected_slots: default_protected_slots(),
            short_text_max_chars: default_short_text_max_chars(),
            delta_clamp: default_delta_clamp(),
        }
    }
}

fn default_protected_slots() -> Vec<String> {
    vec!["player_name".to_string(), "alive_status".to_string()]
}

fn default_short_text_max_chars() -> usize {
    150
}

fn default_delta_clamp() -> (f32, f32) {
    (-20.0, 20.0)
}

/// Scoring weights and decay parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Score weight for pinned-tier records
    #[serde(default = "default_pinned_weight")]
    pub pinned_weight: f32,
    /// Score weight for important-tier records
    #[serde(default = "default_important_weight")]
    pub important_weight: f32,
    /// Score weight for regular-tier records
    #[serde(default = "default_regular_weight")]
    pub regular_weight: f32,
    /// Recency half-life in days
    #[serde(default = "default_half_life_days")]
    pub recency_half_life_days: f32,
    /// Lower bound of the recency factor; old records never decay below this
    #[serde(default = "default_recency_floor")]
    pub recency_floor: f32,
    /// Lower bound of the relevance factor
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f32,
    /// Multiplier applied to superseded records
    #[serde(default = "default_supersession_penalty")]
    pub supersession_penalty: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pinned_weight: default_pinned_weight(),
            important_weight: default_important_weight(),
            regular_weight: default_regular_weight(),
            recency_half_life_days: default_half_life_days(),
            recency_floor: default_recency_floor(),
            relevance_floor: default_relevance_floor(),
            supersession_penalty: default_supersession_penalty(),
        }
    }
}

fn default_pinned_weight() -> f32 {
    2.0
}

fn default_important_weight() -> f32 {
    1.5
}

fn default_regular_weight() -> f32 {
    1.0
}

fn default_half_life_days() -> f32 {
    7.0
}

fn default_recency_floor() -> f32 {
    0.3
}

fn default_relevance_floor() -> f32 {
    0.3
}

fn default_supersession_penalty() -> f32 {
    0.1
}

/// Candidate collection and budgeting limits
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Age window for the high-signal recent source, in days
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,
    /// Maximum candidates from the high-signal recent source
    #[serde(default = "default_recent_count")]
    pub recent_count: usize,
    /// Maximum candidates from the semantic search source
    #[serde(default = "default_semantic_top_k")]
    pub semantic_top_k: usize,
    /// Default character budget, in units of roughly three characters each
    #[serde(default = "default_budget_units")]
    pub budget_units: usize,
    /// Similarity at or above which full text is rendered instead of short text
    #[serde(default = "default_high_relevance_threshold")]
    pub high_relevance_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            recent_window_days: default_recent_window_days(),
            recent_count: default_recent_count(),
            semantic_top_k: default_semantic_top_k(),
            budget_units: default_budget_units(),
            high_relevance_threshold: default_high_relevance_threshold(),
        }
    }
}

fn default_recent_window_days() -> i64 {
    3
}

fn default_recent_count() -> usize {
    5
}

fn default_semantic_top_k() -> usize {
    10
}

fn default_budget_units() -> usize {
    600
}

fn default_high_relevance_threshold() -> f32 {
    0.85
}

/// Event vocabularies driving classification and conflict resolution
#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
    /// Event types that always produce a pinned milestone, keyed by event
    /// type with the milestone label as value
    #[serde(default = "default_milestone_events")]
    pub milestone_events: BTreeMap<String, String>,
    /// Event types whose first occurrence synthesizes a milestone label
    #[serde(default = "default_first_occurrence_events")]
    pub first_occurrence_events: BTreeMap<String, String>,
    /// Event types surfaced by the high-signal recent source
    #[serde(default = "default_high_signal_events")]
    pub high_signal_events: BTreeSet<String>,
    /// Superseding event type mapped to the event type it supersedes
    #[serde(default = "default_supersession_pairs")]
    pub supersession_pairs: BTreeMap<String, String>,
    /// Importance at or above which a record is classified Important
    #[serde(default = "default_high_importance_threshold")]
    pub high_importance_threshold: u8,
    /// Per-event overrides for the high-importance threshold
    #[serde(default)]
    pub high_importance_overrides: BTreeMap<String, u8>,
    /// Known interaction types; unknown tags are allowed but logged
    #[serde(default = "default_interaction_types")]
    pub interaction_types: BTreeSet<String>,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            milestone_events: default_milestone_events(),
            first_occurrence_events: default_first_occurrence_events(),
            high_signal_events: default_high_signal_events(),
            supersession_pairs: default_supersession_pairs(),
            high_importance_threshold: default_high_importance_threshold(),
            high_importance_overrides: BTreeMap::new(),
            interaction_types: default_interaction_types(),
        }
    }
}

fn default_milestone_events() -> BTreeMap<String, String> {
    [
        ("first_meeting", "first_meeting"),
        ("life_saved", "life_saved"),
        ("betrayal", "betrayal"),
        ("confession", "confession"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_first_occurrence_events() -> BTreeMap<String, String> {
    [
        ("conversation", "first_conversation"),
        ("gift_received", "first_gift"),
        ("quest_completed", "first_quest"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_high_signal_events() -> BTreeSet<String> {
    [
        "promise_made",
        "promise_broken",
        "gift_received",
        "quest_completed",
        "betrayal",
        "life_saved",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_supersession_pairs() -> BTreeMap<String, String> {
    [
        ("promise_broken", "promise_made"),
        ("promise_kept", "promise_made"),
        ("secret_revealed", "secret_shared"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_high_importance_threshold() -> u8 {
    8
}

fn default_interaction_types() -> BTreeSet<String> {
    [
        "conversation",
        "gift_received",
        "quest_completed",
        "quest_failed",
        "promise_made",
        "promise_kept",
        "promise_broken",
        "secret_shared",
        "secret_revealed",
        "betrayal",
        "life_saved",
        "first_meeting",
        "confession",
        "observation",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl MemoryConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: MemoryConfig =
            toml::from_str(text).map_err(|e| MemoryError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Score weight for a tier
    pub fn tier_weight(&self, tier: crate::record::Tier) -> f32 {
        match tier {
            crate::record::Tier::Pinned => self.scoring.pinned_weight,
            crate::record::Tier::Important => self.scoring.important_weight,
            crate::record::Tier::Regular => self.scoring.regular_weight,
        }
    }

    /// High-importance threshold for an event type, honoring overrides
    pub fn high_importance_threshold(&self, event_type: &str) -> u8 {
        self.events
            .high_importance_overrides
            .get(event_type)
            .copied()
            .unwrap_or(self.events.high_importance_threshold)
    }

    /// Check every tunable, failing fast on malformed values
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f32) -> Result<()> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(MemoryError::ConfigInvalid(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        }

        fn unit_range(name: &str, value: f32) -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(MemoryError::ConfigInvalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )))
            }
        }

        positive("scoring.pinned_weight", self.scoring.pinned_weight)?;
        positive("scoring.important_weight", self.scoring.important_weight)?;
        positive("scoring.regular_weight", self.scoring.regular_weight)?;
        positive(
            "scoring.recency_half_life_days",
            self.scoring.recency_half_life_days,
        )?;
        unit_range("scoring.recency_floor", self.scoring.recency_floor)?;
        unit_range("scoring.relevance_floor", self.scoring.relevance_floor)?;
        unit_range(
            "scoring.supersession_penalty",
            self.scoring.supersession_penalty,
        )?;
        unit_range(
            "retrieval.high_relevance_threshold",
            self.retrieval.high_relevance_threshold,
        )?;

        if self.retrieval.recent_window_days <= 0 {
            return Err(MemoryError::ConfigInvalid(format!(
                "retrieval.recent_window_days must be positive, got {}",
                self.retrieval.recent_window_days
            )));
        }
        if self.retrieval.budget_units == 0 {
            return Err(MemoryError::ConfigInvalid(
                "retrieval.budget_units must be positive".to_string(),
            ));
        }
        if self.short_text_max_chars == 0 {
            return Err(MemoryError::ConfigInvalid(
                "short_text_max_chars must be positive".to_string(),
            ));
        }
        if self.delta_clamp.0 > self.delta_clamp.1 {
            return Err(MemoryError::ConfigInvalid(format!(
                "delta_clamp range is inverted: ({}, {})",
                self.delta_clamp.0, self.delta_clamp.1
            )));
        }
        if !(1..=10).contains(&self.events.high_importance_threshold) {
            return Err(MemoryError::ConfigInvalid(format!(
                "events.high_importance_threshold must be within [1, 10], got {}",
                self.events.high_importance_threshold
            )));
        }
        for (event, threshold) in &self.events.high_importance_overrides {
            if !(1..=10).contains(threshold) {
                return Err(MemoryError::ConfigInvalid(format!(
                    "events.high_importance_overrides['{event}'] must be within [1, 10], got {threshold}"
                )));
            }
        }

        Ok(())
    }
}
