//! Retrieval pipeline: collect, score, budget, consolidate

pub mod budget;
pub mod collect;
pub mod consolidate;
pub mod header;
pub mod score;

pub use budget::{BudgetAllocator, BudgetResult, RenderedCandidate, cost_units, render_line};
pub use collect::{Candidate, CandidateBody, CandidateCollector};
pub use consolidate::{ConsolidationJob, ConsolidationResult};
pub use header::{RelationshipHeaderGenerator, SyntheticHeader, status_label};
pub use score::{PROTECTED_SCORE, ScoredCandidate, ScoringEngine, recency_factor, relevance_factor};
