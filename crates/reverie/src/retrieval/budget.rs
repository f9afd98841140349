//! Budget allocation
//!
//! Packs scored candidates into a fixed character budget. Costs are counted
//! in units of roughly three characters (`ceil(chars / 3)`). A candidate is
//! rendered from its full text only when its similarity clears the
//! high-relevance threshold; otherwise the short text is used, so budget
//! pressure alone never changes a record's tone. The non-protected selection
//! is always a prefix of the ranked order: the first candidate that does not
//! fit closes the budget, so growing the budget can only extend the
//! selection, never reshuffle it. Protected candidates are always accepted —
//! past budget they log an overage and close the budget the same way.

use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::record::{MemoryRecord, Tier};
use crate::retrieval::collect::{Candidate, CandidateBody};
use crate::retrieval::score::ScoredCandidate;

/// A selected candidate, rendered and ready for prompt assembly
#[derive(Debug, Clone)]
pub struct RenderedCandidate {
    /// Fully rendered line
    pub text: String,
    /// Tier of the underlying record; `None` for the synthesized header
    pub tier: Option<Tier>,
    pub protected: bool,
    pub score: f32,
}

/// Result of filling one budget
#[derive(Debug, Clone, Default)]
pub struct BudgetResult {
    pub selected: Vec<RenderedCandidate>,
    /// Units consumed, possibly exceeding the budget via protected overage
    pub consumed_units: usize,
    /// Units left; zero once consumed meets or exceeds the budget
    pub remaining_units: usize,
    /// Whether protected candidates pushed consumption past the budget
    pub overflowed: bool,
}

/// Greedy budget filler over score-ordered candidates
pub struct BudgetAllocator {
    config: Arc<MemoryConfig>,
}

impl BudgetAllocator {
    pub fn new(config: Arc<MemoryConfig>) -> Self {
        Self { config }
    }

    /// Fill `budget_units` from candidates already sorted by rank.
    pub fn fill_budget(&self, ranked: &[ScoredCandidate], budget_units: usize) -> BudgetResult {
        let mut result = BudgetResult {
            remaining_units: budget_units,
            ..Default::default()
        };
        let mut closed = false;

        for scored in ranked {
            let text = self.render(&scored.candidate);
            let cost = cost_units(&text);

            if scored.candidate.protected {
                if cost > result.remaining_units && !result.overflowed {
                    result.overflowed = true;
                    tracing::warn!(
                        budget_units,
                        cost,
                        remaining = result.remaining_units,
                        "protected candidate exceeds budget, accepting as overage"
                    );
                }
                result.consumed_units += cost;
                result.remaining_units = result.remaining_units.saturating_sub(cost);
                result.selected.push(RenderedCandidate {
                    text,
                    tier: scored.candidate.record().map(|r| r.tier),
                    protected: true,
                    score: scored.score,
                });
                continue;
            }

            // The first non-fitting candidate closes the budget; skipping
            // past it would let a larger budget displace earlier picks.
            if closed || result.overflowed || cost > result.remaining_units {
                closed = true;
                continue;
            }
            result.consumed_units += cost;
            result.remaining_units -= cost;
            result.selected.push(RenderedCandidate {
                text,
                tier: scored.candidate.record().map(|r| r.tier),
                protected: false,
                score: scored.score,
            });
        }

        result
    }

    /// Render one candidate, choosing full or short text by similarity
    pub fn render(&self, candidate: &Candidate) -> String {
        match &candidate.body {
            CandidateBody::Header(header) => header.text.clone(),
            CandidateBody::Record(record) => {
                let similarity = candidate.similarity.unwrap_or(0.0);
                let use_full = similarity >= self.config.retrieval.high_relevance_threshold;
                let text = if use_full {
                    &record.full_text
                } else {
                    &record.short_text
                };
                render_line(record, text)
            }
        }
    }
}

/// `ceil(chars / 3)` cost estimate of one rendered line
pub fn cost_units(text: &str) -> usize {
    text.chars().count().div_ceil(3)
}

/// The consumer-facing line format:
/// `[<tier/milestone>, <eventType>, importance:N, felt:<emotion>] <text>`
pub fn render_line(record: &MemoryRecord, text: &str) -> String {
    let label = record
        .milestone_type
        .clone()
        .unwrap_or_else(|| record.tier.to_string());
    match &record.emotion {
        Some(emotion) => format!(
            "[{label}, {}, importance:{}, felt:{emotion}] {text}",
            record.event_type, record.importance
        ),
        None => format!(
            "[{label}, {}, importance:{}] {text}",
            record.event_type, record.importance
        ),
    }
}
