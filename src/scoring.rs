//! Final score, verdict and reasoning trail.
//!
//! All three components sit on the same truth axis as the consensus score:
//! credibility and temporal validity scale how far the result may move away
//! from the undecided midpoint of 50.
//!
//! ```text
//! evidence_consensus  = E
//! source_credibility  = 50 + (C/100)·(E − 50)
//! temporal_validity   = 50 + (T/100)·(E − 50)
//! final               = round(Σ wᵢ·componentᵢ / Σ wᵢ)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credibility::{SourceCredibilityScorer, VerificationStatus};
use crate::error::PipelineError;
use crate::evidence::evaluate::RELIABLE_CREDIBILITY;
use crate::types::{
    clamp_score, ConsensusAnalysis, CredibilitySummary, EvidenceItem, EvidenceStrength,
    ScoreBreakdown, ScoreEntry, Verdict,
};

/// Fewer usable items than this can never produce a verdict.
pub const MIN_EVIDENCE: usize = 2;
/// Mean credibility below this can never produce a verdict.
pub const MIN_MEAN_CREDIBILITY: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub evidence: f64,
    pub credibility: f64,
    pub temporal: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            evidence: 0.5,
            credibility: 0.3,
            temporal: 0.2,
        }
    }
}

impl ScoringWeights {
    /// Weights must be finite, non-negative and not all zero.
    pub fn new(evidence: f64, credibility: f64, temporal: f64) -> Option<Self> {
        let weights = Self {
            evidence,
            credibility,
            temporal,
        };
        let parts = [evidence, credibility, temporal];
        let valid = parts.iter().all(|w| w.is_finite() && *w >= 0.0) && weights.total() > 0.0;
        valid.then_some(weights)
    }

    /// Parse `"0.5,0.3,0.2"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<f64> = raw
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [e, c, t] => Self::new(*e, *c, *t),
            _ => None,
        }
    }

    pub fn total(&self) -> f64 {
        self.evidence + self.credibility + self.temporal
    }
}

/// Output of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub final_score: u8,
    pub verdict: Verdict,
    pub evidence_strength: EvidenceStrength,
    pub breakdown: ScoreBreakdown,
    pub credibility_summary: CredibilitySummary,
    pub reasoning: Vec<String>,
    /// Set when the strength tier forced the verdict to unverifiable.
    pub insufficiency: Option<String>,
}

pub struct ScoreAggregator {
    weights: ScoringWeights,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

impl ScoreAggregator {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn aggregate(
        &self,
        evidence: &[EvidenceItem],
        consensus: &ConsensusAnalysis,
        temporal_score: u8,
        scorer: &SourceCredibilityScorer,
    ) -> Aggregate {
        let credibility_summary = summarize_credibility(evidence, scorer);
        let mean_credibility = credibility_summary.average_score;
        let e = consensus.consensus_score;

        let toward = |scale: u8| clamp_score(50.0 + (scale as f64 / 100.0) * (e as f64 - 50.0));
        let entries = vec![
            ScoreEntry {
                metric: "evidence_consensus".to_string(),
                score: e,
                raw_score: e,
                weight: self.weights.evidence,
                reasoning: format!(
                    "{} supporting, {} contradicting, {} neutral",
                    consensus.supporting_count, consensus.contradicting_count, consensus.neutral_count
                ),
            },
            ScoreEntry {
                metric: "source_credibility".to_string(),
                score: toward(mean_credibility),
                raw_score: mean_credibility,
                weight: self.weights.credibility,
                reasoning: format!(
                    "mean credibility {} across {} source(s), {} reliable",
                    mean_credibility,
                    evidence.len(),
                    consensus.reliable_sources_count
                ),
            },
            ScoreEntry {
                metric: "temporal_validity".to_string(),
                score: toward(temporal_score),
                raw_score: temporal_score,
                weight: self.weights.temporal,
                reasoning: format!("temporal validity {}/100", temporal_score),
            },
        ];

        let final_score = weighted(&entries);
        let evidence_strength = strength_tier(evidence.len(), mean_credibility);

        let insufficiency = (evidence_strength == EvidenceStrength::Insufficient).then(|| {
            if evidence.len() < MIN_EVIDENCE {
                PipelineError::InsufficientEvidence {
                    usable: evidence.len(),
                    required: MIN_EVIDENCE,
                }
                .to_string()
            } else {
                format!(
                    "insufficient evidence: mean source credibility {} is below {}",
                    mean_credibility, MIN_MEAN_CREDIBILITY
                )
            }
        });

        let verdict = if insufficiency.is_some() {
            Verdict::Unverifiable
        } else {
            verdict_for(final_score)
        };

        let mut reasoning: Vec<String> = entries
            .iter()
            .map(|entry| {
                format!(
                    "{} {} (weight {:.2}): {}",
                    entry.metric, entry.score, entry.weight, entry.reasoning
                )
            })
            .collect();
        reasoning.push(format!("weighted final score {} maps to {}", final_score, verdict_for(final_score)));
        if let Some(reason) = &insufficiency {
            reasoning.push(format!("{}; verdict reported as {}", reason, Verdict::Unverifiable));
        }

        debug!(final_score, verdict = %verdict, strength = ?evidence_strength, "aggregated");

        Aggregate {
            final_score,
            verdict,
            evidence_strength,
            breakdown: ScoreBreakdown {
                entries,
                final_score,
            },
            credibility_summary,
            reasoning,
            insufficiency,
        }
    }
}

fn weighted(entries: &[ScoreEntry]) -> u8 {
    let total: f64 = entries.iter().map(|e| e.weight).sum();
    if total <= 0.0 {
        return 50;
    }
    let sum: f64 = entries.iter().map(|e| e.weight * e.score as f64).sum();
    clamp_score(sum / total)
}

pub fn verdict_for(score: u8) -> Verdict {
    match score {
        90.. => Verdict::True,
        75..=89 => Verdict::MostlyTrue,
        50..=74 => Verdict::HalfTrue,
        25..=49 => Verdict::MostlyFalse,
        10..=24 => Verdict::False,
        _ => Verdict::PantsOnFire,
    }
}

pub fn strength_tier(count: usize, mean_credibility: u8) -> EvidenceStrength {
    if count < MIN_EVIDENCE || mean_credibility < MIN_MEAN_CREDIBILITY {
        EvidenceStrength::Insufficient
    } else if count >= 5 && mean_credibility >= 70 {
        EvidenceStrength::Strong
    } else if count >= 3 && mean_credibility >= 50 {
        EvidenceStrength::Moderate
    } else {
        EvidenceStrength::Weak
    }
}

pub fn summarize_credibility(evidence: &[EvidenceItem], scorer: &SourceCredibilityScorer) -> CredibilitySummary {
    if evidence.is_empty() {
        return CredibilitySummary::default();
    }

    let mut categories = BTreeMap::new();
    let mut flagged_count = 0;
    for item in evidence {
        let credibility = scorer.score(&item.url);
        *categories.entry(credibility.category.to_string()).or_insert(0) += 1;
        if credibility.verification_status == VerificationStatus::Flagged {
            flagged_count += 1;
        }
    }

    let total: u32 = evidence.iter().map(|e| e.credibility_score as u32).sum();
    CredibilitySummary {
        average_score: clamp_score(total as f64 / evidence.len() as f64),
        high_credibility_count: evidence
            .iter()
            .filter(|e| e.credibility_score >= RELIABLE_CREDIBILITY)
            .count(),
        flagged_count,
        categories,
    }
}
