//! Per-item relevance and support classification, and the claim-level
//! consensus signal derived from them.
//!
//! The heuristic path always runs first. When a generator is configured its
//! judgements replace the heuristic ones item by item, but only entries that
//! name a real item, a known support type and a relevance within 0–100 are
//! accepted.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analysis::keywords::{extract_keywords, overlap_ratio};
use crate::analysis::parse::parse_json;
use crate::analysis::prompts::evaluation_prompt;
use crate::error::PipelineError;
use crate::traits::{GenerationConfig, TextGenerator};
use crate::types::{
    clamp_score, ConsensusAnalysis, EvaluationMethod, EvidenceItem, SupportType,
};

/// Items at or above this credibility count as reliable.
pub const RELIABLE_CREDIBILITY: u8 = 80;

/// Below this relevance an item is never classified as taking a side.
const MIN_SIDED_RELEVANCE: u8 = 25;
/// Relevant items with no contradiction cue read as weak support.
const IMPLICIT_SUPPORT_RELEVANCE: u8 = 60;

/// Items beyond this are left to the heuristic to keep the prompt bounded.
const MAX_GENERATED_ITEMS: usize = 20;

const NEUTRAL_RATINGS: &[&str] = &[
    "half", "mixture", "mixed", "partly", "partially", "unproven", "unverified", "missing context",
    "needs context", "outdated",
];
const FALSE_RATINGS: &[&str] = &[
    "false", "pants on fire", "incorrect", "misleading", "fake", "wrong", "inaccurate", "baseless",
    "no evidence", "fabricated", "hoax", "satire", "distort", "exaggerat", "not true", "untrue",
    "debunked",
];
const TRUE_RATINGS: &[&str] = &["true", "correct", "accurate", "verified", "confirmed"];

const CONTRADICTING_CUES: &[&str] = &[
    "false", "myth", "debunk", "hoax", "no evidence", "not true", "untrue", "incorrect",
    "misleading", "fake", "denied", "refuted", "disproven", "baseless", "contrary to",
];
const SUPPORTING_CUES: &[&str] = &[
    "confirmed", "confirms", "according to", "data show", "figures show", "reported", "announced",
    "official", "verified", "accurate",
];

#[derive(Debug, Clone)]
pub struct Evaluated {
    pub evidence: Vec<EvidenceItem>,
    pub consensus: ConsensusAnalysis,
    pub method: EvaluationMethod,
    pub warnings: Vec<String>,
}

pub struct EvidenceEvaluator {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl EvidenceEvaluator {
    /// `generator = None` keeps evaluation fully local.
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn evaluate(&self, claim: &str, evidence: Vec<EvidenceItem>) -> Evaluated {
        let mut evidence = Self::heuristic(claim, evidence);
        let mut method = EvaluationMethod::Heuristic;
        let mut warnings = Vec::new();

        if let Some(generator) = self.generator.as_ref().filter(|_| !evidence.is_empty()) {
            match self.judge(generator.as_ref(), claim, &evidence).await {
                Ok(judgements) => {
                    let applied = judgements.len();
                    for j in judgements {
                        let item = &mut evidence[j.index];
                        item.support_type = j.support_type;
                        item.relevance_score = j.relevance;
                    }
                    debug!(applied, "generator judgements applied");
                    method = EvaluationMethod::Generative;
                }
                Err(e) => {
                    warn!(error = %e, "evidence evaluation fell back to heuristic");
                    warnings.push(format!("evidence evaluation: {}; used keyword heuristic", e));
                }
            }
        }

        let consensus = consensus(&evidence);
        info!(
            supporting = consensus.supporting_count,
            contradicting = consensus.contradicting_count,
            neutral = consensus.neutral_count,
            consensus = consensus.consensus_score,
            "evidence evaluated"
        );

        Evaluated {
            evidence,
            consensus,
            method,
            warnings,
        }
    }

    /// Keyword-overlap relevance plus rating and cue-word support typing.
    pub fn heuristic(claim: &str, mut evidence: Vec<EvidenceItem>) -> Vec<EvidenceItem> {
        let claim_keywords = extract_keywords(claim, 0);
        for item in &mut evidence {
            let text = format!("{} {}", item.title, item.snippet);
            item.relevance_score = clamp_score(overlap_ratio(&claim_keywords, &text) * 100.0);
            item.support_type = classify(item);
        }
        evidence
    }

    async fn judge(
        &self,
        generator: &dyn TextGenerator,
        claim: &str,
        evidence: &[EvidenceItem],
    ) -> Result<Vec<Judgement>, PipelineError> {
        let listed: Vec<(usize, &str, &str, &str)> = evidence
            .iter()
            .take(MAX_GENERATED_ITEMS)
            .enumerate()
            .map(|(i, e)| (i, e.title.as_str(), e.snippet.as_str(), e.publisher.as_str()))
            .collect();
        let prompt = evaluation_prompt(claim, &listed);
        let config = GenerationConfig {
            temperature: 0.0,
            max_tokens: 1024,
        };

        let raw = match tokio::time::timeout(self.timeout, generator.generate(&prompt, config)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(PipelineError::unavailable(generator.name(), e)),
            Err(_) => return Err(PipelineError::timed_out(generator.name(), self.timeout)),
        };

        let entries: Vec<RawJudgement> = parse_json(&raw)
            .into_result()
            .map_err(|reason| PipelineError::malformed(generator.name(), reason))?;

        let judgements: Vec<Judgement> = entries
            .into_iter()
            .filter_map(|e| e.validate(listed.len()))
            .collect();

        if judgements.is_empty() {
            return Err(PipelineError::malformed(generator.name(), "no valid evidence judgements"));
        }
        Ok(judgements)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJudgement {
    #[serde(default)]
    index: Value,
    #[serde(default)]
    support_type: String,
    #[serde(default)]
    relevance: Value,
}

#[derive(Debug)]
struct Judgement {
    index: usize,
    support_type: SupportType,
    relevance: u8,
}

impl RawJudgement {
    fn validate(self, item_count: usize) -> Option<Judgement> {
        let index = self.index.as_u64().map(|i| i as usize).filter(|i| *i < item_count)?;
        let support_type = SupportType::parse(&self.support_type)?;
        let relevance = self
            .relevance
            .as_f64()
            .filter(|r| (0.0..=100.0).contains(r))?;
        Some(Judgement {
            index,
            support_type,
            relevance: clamp_score(relevance),
        })
    }
}

/// Reviewer rating text to support type; `None` for ratings we cannot read.
pub fn rating_support(rating: &str) -> Option<SupportType> {
    let lower = rating.to_lowercase();
    if NEUTRAL_RATINGS.iter().any(|r| lower.contains(r)) {
        Some(SupportType::Neutral)
    } else if FALSE_RATINGS.iter().any(|r| lower.contains(r)) {
        Some(SupportType::Contradicting)
    } else if TRUE_RATINGS.iter().any(|r| lower.contains(r)) {
        Some(SupportType::Supporting)
    } else {
        None
    }
}

fn classify(item: &EvidenceItem) -> SupportType {
    if let Some(support) = item.rating.as_deref().and_then(rating_support) {
        return support;
    }
    if item.relevance_score < MIN_SIDED_RELEVANCE {
        return SupportType::Neutral;
    }

    let text = format!("{} {}", item.title, item.snippet).to_lowercase();
    if CONTRADICTING_CUES.iter().any(|c| text.contains(c)) {
        SupportType::Contradicting
    } else if SUPPORTING_CUES.iter().any(|c| text.contains(c))
        || item.relevance_score >= IMPLICIT_SUPPORT_RELEVANCE
    {
        SupportType::Supporting
    } else {
        SupportType::Neutral
    }
}

/// Consensus over all evaluated items.
///
/// ```text
/// supportRatio    > 0.7  →  70 + 30·(r − 0.7)/0.3
/// contradictRatio > 0.7  →  30 − 30·(r − 0.7)/0.3
/// otherwise              →  50 ± 5 per net reliable source, capped at ±15
/// no evidence            →  50
/// ```
pub fn consensus(items: &[EvidenceItem]) -> ConsensusAnalysis {
    let count = |t: SupportType| items.iter().filter(|i| i.support_type == t).count();
    let reliable_with = |t: SupportType| {
        items
            .iter()
            .filter(|i| i.support_type == t && i.credibility_score >= RELIABLE_CREDIBILITY)
            .count() as i64
    };

    let supporting_count = count(SupportType::Supporting);
    let contradicting_count = count(SupportType::Contradicting);
    let neutral_count = count(SupportType::Neutral);
    let reliable_sources_count = items
        .iter()
        .filter(|i| i.credibility_score >= RELIABLE_CREDIBILITY)
        .count();

    let consensus_score = if items.is_empty() {
        50
    } else {
        let n = items.len() as f64;
        let support_ratio = supporting_count as f64 / n;
        let contradict_ratio = contradicting_count as f64 / n;
        let score = if support_ratio > 0.7 {
            70.0 + 30.0 * (support_ratio - 0.7) / 0.3
        } else if contradict_ratio > 0.7 {
            30.0 - 30.0 * (contradict_ratio - 0.7) / 0.3
        } else {
            let net = reliable_with(SupportType::Supporting) - reliable_with(SupportType::Contradicting);
            50.0 + (5 * net).clamp(-15, 15) as f64
        };
        clamp_score(score)
    };

    ConsensusAnalysis {
        supporting_count,
        contradicting_count,
        neutral_count,
        consensus_score,
        reliable_sources_count,
    }
}
