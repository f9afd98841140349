//! Live relationship header
//!
//! Synthesizes a compact status line from the caller-owned relationship
//! state. The header is regenerated on every retrieval and never persisted,
//! so it cannot go stale. Generation never fails: the only stored input is
//! the first-meeting timestamp, and an unreachable backend degrades
//! `days_known` to zero instead of costing the dialogue turn its header.

use std::sync::Arc;

use chrono::Utc;

use crate::record::{RelationshipState, Tier};
use crate::store::{RecordFilter, RecordStorage};

/// The milestone label that anchors `days_known`
const FIRST_MEETING: &str = "first_meeting";

/// A synthesized, never-persisted status summary
#[derive(Debug, Clone)]
pub struct SyntheticHeader {
    /// Discrete status label from the threshold table
    pub status: &'static str,
    /// Whole days since the first-meeting milestone, 0 if none exists
    pub days_known: i64,
    /// The rendered header line
    pub text: String,
}

/// Builds the live relationship header for an agent
pub struct RelationshipHeaderGenerator {
    storage: Arc<dyn RecordStorage>,
}

impl RelationshipHeaderGenerator {
    pub fn new(storage: Arc<dyn RecordStorage>) -> Self {
        Self { storage }
    }

    /// Generate the header from the live dimension values and the agent's
    /// first-meeting milestone timestamp.
    pub async fn generate(&self, agent_id: &str, state: &RelationshipState) -> SyntheticHeader {
        let pinned = self
            .storage
            .find(agent_id, &RecordFilter::new().with_tier(Tier::Pinned))
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(agent_id, %err, "storage unavailable, days_known falls back to 0");
                Vec::new()
            });
        let first_meeting = pinned
            .iter()
            .filter(|r| r.milestone_type.as_deref() == Some(FIRST_MEETING))
            .map(|r| r.created_at)
            .min();
        let days_known = first_meeting
            .map(|at| (Utc::now() - at).num_days().max(0))
            .unwrap_or(0);

        let status = status_label(state);
        let text = format!(
            "[relationship] status:{status} trust:{:.0} respect:{:.0} affection:{:.0} \
             fear:{:.0} familiarity:{:.0} days_known:{days_known}",
            state.trust, state.respect, state.affection, state.fear, state.familiarity,
        );
        SyntheticHeader {
            status,
            days_known,
            text,
        }
    }
}

/// Discrete status label from the deterministic threshold table.
///
/// Rule order is fixed: fear dominates, then the low-trust split on
/// affection, then graduated trust bands combined with affection.
pub fn status_label(state: &RelationshipState) -> &'static str {
    if state.fear > 70.0 {
        return "terrified";
    }
    if state.trust < 15.0 {
        return if state.affection < 0.0 {
            "hostile"
        } else {
            "distrustful"
        };
    }
    if state.trust < 30.0 {
        return if state.affection < 0.0 { "wary" } else { "cautious" };
    }
    if state.trust < 50.0 {
        return if state.affection >= 20.0 {
            "friendly_acquaintance"
        } else {
            "neutral"
        };
    }
    if state.trust < 70.0 {
        return if state.affection >= 40.0 { "friend" } else { "trusted" };
    }
    if state.trust < 85.0 {
        return if state.affection >= 60.0 {
            "close_friend"
        } else {
            "trusted_ally"
        };
    }
    if state.affection >= 60.0 { "beloved" } else { "respected" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStorage;
    use crate::testing::{FailingStorage, record_builder};

    fn state(trust: f32, affection: f32, fear: f32) -> RelationshipState {
        RelationshipState {
            trust,
            respect: 0.0,
            affection,
            fear,
            familiarity: 50.0,
        }
    }

    #[test]
    fn test_fear_rule_fires_first() {
        // High trust and affection cannot outweigh terror
        assert_eq!(status_label(&state(90.0, 80.0, 71.0)), "terrified");
        assert_eq!(status_label(&state(10.0, -20.0, 80.0)), "terrified");
    }

    #[test]
    fn test_fear_exactly_at_threshold_does_not_fire() {
        assert_eq!(status_label(&state(10.0, -20.0, 70.0)), "hostile");
    }

    #[test]
    fn test_low_trust_split_on_affection() {
        assert_eq!(status_label(&state(5.0, -1.0, 0.0)), "hostile");
        assert_eq!(status_label(&state(5.0, 0.0, 0.0)), "distrustful");
    }

    #[test]
    fn test_graduated_bands() {
        assert_eq!(status_label(&state(20.0, -10.0, 0.0)), "wary");
        assert_eq!(status_label(&state(20.0, 10.0, 0.0)), "cautious");
        assert_eq!(status_label(&state(40.0, 10.0, 0.0)), "neutral");
        assert_eq!(status_label(&state(40.0, 30.0, 0.0)), "friendly_acquaintance");
        assert_eq!(status_label(&state(60.0, 10.0, 0.0)), "trusted");
        assert_eq!(status_label(&state(60.0, 50.0, 0.0)), "friend");
        assert_eq!(status_label(&state(80.0, 10.0, 0.0)), "trusted_ally");
        assert_eq!(status_label(&state(80.0, 70.0, 0.0)), "close_friend");
        assert_eq!(status_label(&state(90.0, 10.0, 0.0)), "respected");
        assert_eq!(status_label(&state(90.0, 70.0, 0.0)), "beloved");
    }

    #[tokio::test]
    async fn test_days_known_from_first_meeting_milestone() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .put(
                &record_builder("npc", "first_meeting")
                    .tier(Tier::Pinned)
                    .milestone(FIRST_MEETING)
                    .age_days(12)
                    .build(),
            )
            .await
            .unwrap();

        let generator = RelationshipHeaderGenerator::new(storage);
        let header = generator.generate("npc", &state(50.0, 10.0, 0.0)).await;
        assert_eq!(header.days_known, 12);
        assert!(header.text.contains("days_known:12"));
        assert!(header.text.contains("status:trusted"));
    }

    #[tokio::test]
    async fn test_days_known_zero_without_milestone() {
        let storage = Arc::new(InMemoryStorage::new());
        let generator = RelationshipHeaderGenerator::new(storage);
        let header = generator.generate("npc", &state(0.0, 0.0, 0.0)).await;
        assert_eq!(header.days_known, 0);
    }

    #[tokio::test]
    async fn test_unreachable_storage_still_yields_a_header() {
        let generator = RelationshipHeaderGenerator::new(Arc::new(FailingStorage));
        let header = generator.generate("npc", &state(50.0, 10.0, 0.0)).await;
        assert_eq!(header.days_known, 0);
        assert!(header.text.contains("status:trusted"));
    }
}
