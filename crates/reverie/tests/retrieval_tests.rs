//! Integration tests for the retrieval pipeline
//!
//! Tests end-to-end behavior of collect -> score -> budget:
//! - Protected content (header, slots, pinned milestones) always surfaces
//! - Superseded records rank below their successors
//! - Budgets cut the tail without touching protected content
//! - The relationship header reflects the live dimension values

use std::sync::Arc;

use reverie::config::MemoryConfig;
use reverie::engine::MemoryEngine;
use reverie::record::{EventInput, RelationshipState, RetrievalQuery, Tier};
use reverie::search::InMemorySearch;
use reverie::store::{InMemoryStorage, RecordStorage};
use reverie::testing::{index_record, record_builder};
use reverie::validate::AcceptAll;

// =============================================================================
// Test Fixtures
// =============================================================================

struct World {
    engine: MemoryEngine,
    storage: Arc<InMemoryStorage>,
    search: Arc<InMemorySearch>,
}

fn world() -> World {
    let storage = Arc::new(InMemoryStorage::new());
    let search = Arc::new(InMemorySearch::new());
    let engine = MemoryEngine::new(
        MemoryConfig::default(),
        storage.clone(),
        search.clone(),
        Arc::new(AcceptAll),
    )
    .expect("default config must validate");
    World {
        engine,
        storage,
        search,
    }
}

/// Seed a record with a creation time in the past, bypassing the engine's
/// write path, and index it the way the write path would have.
async fn seed_aged(world: &World, record: reverie::record::MemoryRecord) {
    world.storage.put(&record).await.unwrap();
    index_record(world.search.as_ref(), &record).await;
}

fn event(event_type: &str, full_text: &str, importance: u8) -> EventInput {
    EventInput {
        event_type: event_type.to_string(),
        full_text: full_text.to_string(),
        importance,
        ..Default::default()
    }
}

fn neutral() -> RelationshipState {
    RelationshipState::default()
}

// =============================================================================
// Protected Content
// =============================================================================

mod protected_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_agent_still_gets_a_header() {
        let world = world();
        let lines = world
            .engine
            .retrieve_scored("elder_mira", &neutral(), &RetrievalQuery::new("hello"))
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[relationship]"));
    }

    #[tokio::test]
    async fn test_protected_slot_surfaces_under_unrelated_query() {
        let world = world();
        world
            .engine
            .record_event(
                "elder_mira",
                EventInput {
                    slot: Some("player_name".to_string()),
                    ..event("identity", "The player is called Alexandra.", 5)
                },
            )
            .await
            .unwrap();

        let lines = world
            .engine
            .retrieve_scored(
                "elder_mira",
                &neutral(),
                &RetrievalQuery::new("gossip about the mill wheel"),
            )
            .await
            .unwrap();
        assert!(lines.iter().any(|l| l.contains("Alexandra")));
    }

    #[tokio::test]
    async fn test_slot_update_changes_what_surfaces() {
        let world = world();
        let named = |name: &str| EventInput {
            slot: Some("player_name".to_string()),
            ..event("identity", &format!("The player is called {name}."), 5)
        };
        world.engine.record_event("elder_mira", named("Alex")).await.unwrap();
        world
            .engine
            .record_event("elder_mira", named("Alexandra"))
            .await
            .unwrap();

        let lines = world
            .engine
            .retrieve_scored("elder_mira", &neutral(), &RetrievalQuery::new("hello"))
            .await
            .unwrap();
        assert!(lines.iter().any(|l| l.contains("Alexandra")));
        assert!(!lines.iter().any(|l| l.ends_with("called Alex.")));
    }

    #[tokio::test]
    async fn test_pinned_milestone_surfaces_under_unrelated_query() {
        let world = world();
        seed_aged(
            &world,
            record_builder("elder_mira", "first_meeting")
                .tier(Tier::Pinned)
                .milestone("first_meeting")
                .full_text("Met the traveler at the northern gate.")
                .importance(8)
                .age_days(30)
                .build(),
        )
        .await;

        let lines = world
            .engine
            .retrieve_scored(
                "elder_mira",
                &neutral(),
                &RetrievalQuery::new("completely unrelated turnip prices"),
            )
            .await
            .unwrap();
        assert!(lines.iter().any(|l| l.starts_with("[first_meeting,")));
    }
}

// =============================================================================
// Header Content
// =============================================================================

mod header_tests {
    use super::*;

    #[tokio::test]
    async fn test_fear_dominates_status() {
        let world = world();
        let state = RelationshipState {
            trust: 80.0,
            respect: 50.0,
            affection: 60.0,
            fear: 90.0,
            familiarity: 70.0,
        };
        let lines = world
            .engine
            .retrieve_scored("elder_mira", &state, &RetrievalQuery::new("hello"))
            .await
            .unwrap();
        assert!(lines[0].contains("status:terrified"));
    }

    #[tokio::test]
    async fn test_days_known_anchored_to_first_meeting() {
        let world = world();
        seed_aged(
            &world,
            record_builder("elder_mira", "first_meeting")
                .tier(Tier::Pinned)
                .milestone("first_meeting")
                .age_days(30)
                .build(),
        )
        .await;

        let lines = world
            .engine
            .retrieve_scored("elder_mira", &neutral(), &RetrievalQuery::new("hello"))
            .await
            .unwrap();
        assert!(lines[0].contains("days_known:30"));
    }
}

// =============================================================================
// Ranking
// =============================================================================

mod ranking_tests {
    use super::*;

    #[tokio::test]
    async fn test_superseded_record_ranks_below_successor() {
        let world = world();
        world
            .engine
            .record_event(
                "elder_mira",
                event("promise_made", "Promised to guard the orchard gate.", 6),
            )
            .await
            .unwrap();
        world
            .engine
            .record_event(
                "elder_mira",
                event("promise_broken", "Left the orchard gate unguarded.", 6),
            )
            .await
            .unwrap();

        let lines = world
            .engine
            .retrieve_scored(
                "elder_mira",
                &neutral(),
                &RetrievalQuery::new("the orchard gate promise"),
            )
            .await
            .unwrap();

        let broken = lines.iter().position(|l| l.contains("unguarded"));
        let made = lines.iter().position(|l| l.contains("Promised to guard"));
        assert!(broken.is_some(), "successor must surface");
        assert!(made.is_some(), "superseded record stays retrievable");
        assert!(broken < made, "successor must outrank superseded record");
    }

    #[tokio::test]
    async fn test_min_importance_filters_semantic_candidates() {
        let world = world();
        seed_aged(
            &world,
            record_builder("elder_mira", "conversation")
                .full_text("The blue lantern festival filled the square.")
                .importance(7)
                .age_days(10)
                .build(),
        )
        .await;
        seed_aged(
            &world,
            record_builder("elder_mira", "conversation")
                .full_text("A blue lantern flickered in the square at dusk.")
                .importance(2)
                .age_days(10)
                .build(),
        )
        .await;

        let query = RetrievalQuery::new("the blue lantern in the square").with_min_importance(5);
        let lines = world
            .engine
            .retrieve_scored("elder_mira", &neutral(), &query)
            .await
            .unwrap();
        assert!(lines.iter().any(|l| l.contains("festival filled")));
        assert!(!lines.iter().any(|l| l.contains("flickered")));

        // Without the floor, both come back
        let lines = world
            .engine
            .retrieve_scored(
                "elder_mira",
                &neutral(),
                &RetrievalQuery::new("the blue lantern in the square"),
            )
            .await
            .unwrap();
        assert!(lines.iter().any(|l| l.contains("flickered")));
    }
}

// =============================================================================
// Budgeting
// =============================================================================

mod budget_tests {
    use super::*;

    #[tokio::test]
    async fn test_small_budget_cuts_the_tail_not_the_header() {
        let world = world();
        for i in 0..6 {
            world
                .engine
                .record_event(
                    "elder_mira",
                    event(
                        "conversation",
                        &format!("Harvest festival plans, detail number {i}."),
                        5,
                    ),
                )
                .await
                .unwrap();
        }

        let generous = world
            .engine
            .retrieve_scored(
                "elder_mira",
                &neutral(),
                &RetrievalQuery::new("harvest festival plans").with_budget(600),
            )
            .await
            .unwrap();
        let tight = world
            .engine
            .retrieve_scored(
                "elder_mira",
                &neutral(),
                &RetrievalQuery::new("harvest festival plans").with_budget(15),
            )
            .await
            .unwrap();

        assert!(generous.len() > tight.len());
        assert!(tight[0].starts_with("[relationship]"), "header survives any budget");
    }
}

// =============================================================================
// Degradation
// =============================================================================

mod degradation_tests {
    use super::*;
    use reverie::testing::{FailingSearch, FailingStorage};

    #[tokio::test]
    async fn test_collaborator_outage_still_serves_the_header() {
        let engine = MemoryEngine::new(
            MemoryConfig::default(),
            Arc::new(FailingStorage),
            Arc::new(FailingSearch),
            Arc::new(AcceptAll),
        )
        .expect("default config must validate");

        let lines = engine
            .retrieve_scored("elder_mira", &neutral(), &RetrievalQuery::new("hello"))
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[relationship]"));
        assert!(lines[0].contains("days_known:0"));
    }
}

// =============================================================================
// Tiered Output
// =============================================================================

mod tiered_tests {
    use super::*;

    #[tokio::test]
    async fn test_tiered_retrieval_buckets_by_inclusion_strength() {
        let world = world();
        seed_aged(
            &world,
            record_builder("elder_mira", "first_meeting")
                .tier(Tier::Pinned)
                .milestone("first_meeting")
                .full_text("Met the traveler at the northern gate.")
                .age_days(30)
                .build(),
        )
        .await;
        world
            .engine
            .record_event(
                "elder_mira",
                event("conversation", "The traveler confided their harvest feast plans.", 9),
            )
            .await
            .unwrap();
        world
            .engine
            .record_event(
                "elder_mira",
                event("conversation", "Idle talk about harvest feast decorations.", 4),
            )
            .await
            .unwrap();

        let tiered = world
            .engine
            .retrieve_tiered(
                "elder_mira",
                &neutral(),
                &RetrievalQuery::new("the harvest feast"),
            )
            .await
            .unwrap();

        assert!(tiered.pinned.iter().any(|l| l.starts_with("[relationship]")));
        assert!(tiered.pinned.iter().any(|l| l.contains("northern gate")));
        assert!(tiered.important.iter().any(|l| l.contains("confided")));
        assert!(tiered.relevant.iter().any(|l| l.contains("decorations")));
        assert!(tiered.total_chars > 0);
    }
}
