//! Tier and milestone classification
//!
//! One pure function decides how strongly a record is held. Classification
//! precedence, highest first:
//!
//! 1. Explicit milestone label ⇒ pinned milestone
//! 2. Event type in the configured milestone set ⇒ pinned milestone
//! 3. Explicitly requested tier ⇒ that tier
//! 4. Importance at or above the event's high-importance threshold ⇒ important
//! 5. First occurrence of a qualifying event type ⇒ synthesized pinned milestone
//! 6. Otherwise ⇒ regular
//!
//! No side effects; fully determined by the inputs and the static config.

use crate::config::MemoryConfig;
use crate::record::types::Tier;

/// Outcome of classifying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub tier: Tier,
    pub milestone_type: Option<String>,
}

impl Classification {
    pub fn is_milestone(&self) -> bool {
        self.milestone_type.is_some()
    }
}

/// Classify an event into a tier and optional milestone label.
///
/// `importance` is clamped into 1..=10 before the threshold comparison.
pub fn classify(
    config: &MemoryConfig,
    event_type: &str,
    importance: u8,
    explicit_tier: Option<Tier>,
    explicit_milestone: Option<&str>,
    first_occurrence: bool,
) -> Classification {
    if let Some(label) = explicit_milestone {
        return Classification {
            tier: Tier::Pinned,
            milestone_type: Some(label.to_string()),
        };
    }

    if let Some(label) = config.events.milestone_events.get(event_type) {
        return Classification {
            tier: Tier::Pinned,
            milestone_type: Some(label.clone()),
        };
    }

    if let Some(tier) = explicit_tier {
        return Classification {
            tier,
            milestone_type: None,
        };
    }

    let importance = importance.clamp(1, 10);
    if importance >= config.high_importance_threshold(event_type) {
        return Classification {
            tier: Tier::Important,
            milestone_type: None,
        };
    }

    if first_occurrence {
        if let Some(label) = config.events.first_occurrence_events.get(event_type) {
            return Classification {
                tier: Tier::Pinned,
                milestone_type: Some(label.clone()),
            };
        }
    }

    Classification {
        tier: Tier::Regular,
        milestone_type: None,
    }
}
