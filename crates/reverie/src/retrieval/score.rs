//! Candidate scoring
//!
//! Pure, deterministic scoring over collected candidates:
//!
//! `score = tier_weight × (importance/10) × recency(age) × relevance(sim) × supersession`
//!
//! Both recency and relevance have configured floors, so age and missing
//! similarity discount a record without ever zeroing it out. Protected
//! candidates receive a sentinel score that guarantees first position.

use chrono::{DateTime, Utc};

use crate::config::MemoryConfig;
use crate::retrieval::collect::Candidate;

/// Sentinel score for protected candidates
pub const PROTECTED_SCORE: f32 = f32::MAX;

/// A candidate paired with its computed score
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f32,
}

/// Pure scoring function over candidates
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: std::sync::Arc<MemoryConfig>,
}

impl ScoringEngine {
    pub fn new(config: std::sync::Arc<MemoryConfig>) -> Self {
        Self { config }
    }

    /// Score one candidate at time `now`
    pub fn score(&self, candidate: &Candidate, now: DateTime<Utc>) -> f32 {
        if candidate.protected {
            return PROTECTED_SCORE;
        }
        let Some(record) = candidate.record() else {
            // Non-protected headers do not exist; guard anyway
            return PROTECTED_SCORE;
        };

        let tier_weight = self.config.tier_weight(record.tier);
        let importance = f32::from(record.importance.clamp(1, 10)) / 10.0;
        let recency = recency_factor(record.age_days(now), &self.config);
        let relevance = relevance_factor(candidate.similarity, &self.config);
        let supersession = if record.is_active() {
            1.0
        } else {
            self.config.scoring.supersession_penalty
        };

        tier_weight * importance * recency * relevance * supersession
    }

    /// Score and order all candidates: score descending, then creation time
    /// ascending, then id, so equal scores rank identically on every run.
    pub fn rank(&self, candidates: Vec<Candidate>, now: DateTime<Utc>) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let score = self.score(&candidate, now);
                ScoredCandidate { candidate, score }
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.candidate.created_at().cmp(&b.candidate.created_at()))
                .then_with(|| a.candidate.id().cmp(&b.candidate.id()))
        });
        scored
    }
}

/// Exponential half-life decay with a floor: `recency(0) = 1`,
/// `recency(∞) → floor`.
pub fn recency_factor(age_days: f32, config: &MemoryConfig) -> f32 {
    let floor = config.scoring.recency_floor;
    let half_life = config.scoring.recency_half_life_days;
    floor + (1.0 - floor) * (-age_days * std::f32::consts::LN_2 / half_life).exp()
}

/// Linear relevance with a floor; absent similarity scores as zero similarity
pub fn relevance_factor(similarity: Option<f32>, config: &MemoryConfig) -> f32 {
    let floor = config.scoring.relevance_floor;
    let similarity = similarity.unwrap_or(0.0).clamp(0.0, 1.0);
    floor + (1.0 - floor) * similarity
}
