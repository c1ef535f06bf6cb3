use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Content-addressed identifier (blake3 hex, possibly truncated).
pub type ContentId = String;

/// Longest claim text accepted by the pipeline, in characters.
pub const MAX_CLAIM_CHARS: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimCategory {
    Factual,
    Statistical,
    Temporal,
    Causal,
    Comparative,
    Opinion,
}

impl ClaimCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "factual" => Some(Self::Factual),
            "statistical" => Some(Self::Statistical),
            "temporal" => Some(Self::Temporal),
            "causal" => Some(Self::Causal),
            "comparative" => Some(Self::Comparative),
            "opinion" => Some(Self::Opinion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verifiability {
    High,
    Medium,
    Low,
}

impl Verifiability {
    /// Ordering weight: high > medium > low.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Smallest independently verifiable statement extracted from the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicClaim {
    pub id: ContentId,
    pub text: String,
    pub category: ClaimCategory,
    pub verifiability: Verifiability,
    /// 1–10, higher first.
    pub priority: u8,
    /// `Entity::text` values this claim mentions.
    #[serde(default)]
    pub entity_refs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Date,
    Event,
    Statistic,
    Other,
}

impl EntityType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "person" => Self::Person,
            "organization" | "organisation" | "org" => Self::Organization,
            "location" | "place" => Self::Location,
            "date" | "time" => Self::Date,
            "event" => Self::Event,
            "statistic" | "number" | "quantity" => Self::Statistic,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub entity_type: EntityType,
    /// 0–100.
    pub relevance: u8,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn from_claim_count(count: usize) -> Self {
        match count {
            0 | 1 => Self::Simple,
            2 | 3 => Self::Moderate,
            _ => Self::Complex,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalContext {
    /// Raw date-like mentions found in the text.
    pub mentions: Vec<String>,
    /// Whether the truth of the claim depends on when it is evaluated.
    pub time_sensitive: bool,
}

/// Which path produced a [`ClaimAnalysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMethod {
    Generative,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimAnalysis {
    pub atomic_claims: Vec<AtomicClaim>,
    pub entities: Vec<Entity>,
    pub temporal_context: TemporalContext,
    pub complexity: Complexity,
    pub method: AnalysisMethod,
}

/// Raw claim plus its decomposition. Never mutated after analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    pub atomic_claims: Vec<AtomicClaim>,
}

/// Source family a query is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryTarget {
    FactClaim,
    News,
    Academic,
    Government,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub id: ContentId,
    pub text: String,
    pub target_source_types: Vec<QueryTarget>,
    pub priority: u8,
    /// Provider-agnostic search operators, e.g. `"Federal Reserve"` or `site:gov`.
    #[serde(default)]
    pub operators: Vec<String>,
}

impl SearchQuery {
    pub fn targets_fact_claims(&self) -> bool {
        self.target_source_types.contains(&QueryTarget::FactClaim)
    }

    /// Query text with operators appended, as sent to web providers.
    pub fn full_text(&self) -> String {
        if self.operators.is_empty() {
            self.text.clone()
        } else {
            format!("{} {}", self.text, self.operators.join(" "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportType {
    Supporting,
    Contradicting,
    Neutral,
}

impl SupportType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "supporting" | "supports" | "support" => Some(Self::Supporting),
            "contradicting" | "contradicts" | "refutes" => Some(Self::Contradicting),
            "neutral" | "unrelated" | "mixed" => Some(Self::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceSource {
    FactClaim,
    News,
    SearchResult,
    Academic,
}

/// One normalized piece of retrieved evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: ContentId,
    pub url: String,
    pub publisher: String,
    #[serde(default)]
    pub title: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    /// Reviewer verdict text for fact-claim items ("False", "Mostly true", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    pub credibility_score: u8,
    pub relevance_score: u8,
    pub support_type: SupportType,
    pub source_type: EvidenceSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateType {
    Past,
    Present,
    NearFuture,
    FarFuture,
}

impl std::fmt::Display for DateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Past => write!(f, "past"),
            Self::Present => write!(f, "present"),
            Self::NearFuture => write!(f, "near_future"),
            Self::FarFuture => write!(f, "far_future"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalValidation {
    /// The matched date-like substring.
    pub date_text: String,
    pub is_valid: bool,
    /// `None` when the reference could not be parsed into a date.
    pub date_type: Option<DateType>,
    pub confidence: u8,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusAnalysis {
    pub supporting_count: usize,
    pub contradicting_count: usize,
    pub neutral_count: usize,
    pub consensus_score: u8,
    pub reliable_sources_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub metric: String,
    /// Component value fed into the weighted blend.
    pub score: u8,
    /// Underlying dimension value before it was applied to the evidence direction.
    pub raw_score: u8,
    pub weight: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub entries: Vec<ScoreEntry>,
    pub final_score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    True,
    MostlyTrue,
    HalfTrue,
    MostlyFalse,
    False,
    PantsOnFire,
    Unverifiable,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::MostlyTrue => write!(f, "mostly-true"),
            Self::HalfTrue => write!(f, "half-true"),
            Self::MostlyFalse => write!(f, "mostly-false"),
            Self::False => write!(f, "false"),
            Self::PantsOnFire => write!(f, "pants-on-fire"),
            Self::Unverifiable => write!(f, "unverifiable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStrength {
    Insufficient,
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalSummary {
    pub validations: Vec<TemporalValidation>,
    /// Mean validation confidence; 100 when no dates were referenced.
    pub score: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredibilitySummary {
    pub average_score: u8,
    pub high_credibility_count: usize,
    pub flagged_count: usize,
    /// Evidence count per source category.
    pub categories: BTreeMap<String, usize>,
}

/// Orchestrator phase. Linear; `Failed` always falls through to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Analyzing,
    Querying,
    Gathering,
    Scoring,
    Aggregating,
    Done,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analyzing => write!(f, "analyzing"),
            Self::Querying => write!(f, "querying"),
            Self::Gathering => write!(f, "gathering"),
            Self::Scoring => write!(f, "scoring"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationMethod {
    Generative,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodUsed {
    pub analysis: AnalysisMethod,
    pub evaluation: EvaluationMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub method_used: MethodUsed,
    pub processing_time_ms: u64,
    /// Provider names that were actually queried.
    pub sources_consulted: Vec<String>,
    pub queries_executed: usize,
    /// Phases visited, in order.
    pub phases: Vec<Phase>,
    pub context_date: NaiveDate,
    pub created_at: i64,
}

/// Terminal aggregate of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckReport {
    pub id: ContentId,
    pub original_text: String,
    pub final_score: u8,
    pub verdict: Verdict,
    pub evidence_strength: EvidenceStrength,
    pub atomic_claims: Vec<AtomicClaim>,
    pub evidence: Vec<EvidenceItem>,
    pub consensus: ConsensusAnalysis,
    pub score_breakdown: ScoreBreakdown,
    pub temporal_summary: TemporalSummary,
    pub credibility_summary: CredibilitySummary,
    pub reasoning: Vec<String>,
    pub warnings: Vec<String>,
    pub metadata: ReportMetadata,
}

/// Clamp an arbitrary numeric score into the 0–100 integer range.
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Short content id: first 16 hex chars of a blake3 digest over `parts`.
pub fn content_id(parts: &[&str]) -> ContentId {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex()[..16].to_string()
}
