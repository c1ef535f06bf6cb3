//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::traits::{
    FactClaimHit, FactClaimProvider, GenerationConfig, ReportPersistence, SearchHit, SearchProvider,
    TextGenerator,
};
use crate::types::{
    AnalysisMethod, AtomicClaim, ClaimCategory, ConsensusAnalysis, CredibilitySummary,
    EvaluationMethod, EvidenceItem, EvidenceSource, EvidenceStrength, FactCheckReport, MethodUsed,
    Phase, ReportMetadata, ScoreBreakdown, SupportType, TemporalSummary, Verdict, Verifiability,
};

/// Replays canned replies in order; the last one repeats once exhausted.
pub struct ScriptedGenerator {
    replies: Vec<String>,
    error: Option<String>,
    panic_on: Option<usize>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn replies(replies: Vec<&str>) -> Self {
        Self {
            replies: replies.into_iter().map(String::from).collect(),
            error: None,
            panic_on: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Panic on the `n`th call (zero-based).
    pub fn panicking_on(mut self, n: usize) -> Self {
        self.panic_on = Some(n);
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::replies(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str, _config: GenerationConfig) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on == Some(n) {
            panic!("generator call {} blew up", n);
        }
        if let Some(message) = &self.error {
            anyhow::bail!("{}", message);
        }
        let reply = self
            .replies
            .get(n)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_default();
        Ok(reply)
    }
}

/// Search provider answering from a fixed table keyed by full query text.
pub struct FakeSearch {
    name: String,
    kind: EvidenceSource,
    hits: Vec<(String, Vec<SearchHit>)>,
    fail: bool,
    panic: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeSearch {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: EvidenceSource::SearchResult,
            hits: Vec::new(),
            fail: false,
            panic: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_hits(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.hits.push((query.to_string(), hits));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EvidenceSource {
        self.kind
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic {
            panic!("{} blew up", self.name);
        }
        if self.fail {
            anyhow::bail!("HTTP 503 from {}", self.name);
        }
        Ok(self
            .hits
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, hits)| hits.iter().take(max_results).cloned().collect())
            .unwrap_or_default())
    }
}

pub struct FakeFactClaims {
    name: String,
    hits: Vec<FactClaimHit>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeFactClaims {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hits: Vec::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_hit(mut self, hit: FactClaimHit) -> Self {
        self.hits.push(hit);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FactClaimProvider for FakeFactClaims {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search_claims(&self, _query: &str, max_results: usize) -> Result<Vec<FactClaimHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("HTTP 429 from {}", self.name);
        }
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

/// Records every write; an optional delay holds each write back.
pub struct RecordingPersistence {
    writes: Mutex<Vec<(String, Vec<u8>)>>,
    delay: Option<Duration>,
}

impl Default for RecordingPersistence {
    fn default() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            delay: None,
        }
    }
}

impl RecordingPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn writes(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.writes.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
    }
}

#[async_trait]
impl ReportPersistence for RecordingPersistence {
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.writes.lock().unwrap().push((key.to_string(), payload));
        Ok(format!("memory/{}", key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .writes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }
}

pub fn hit(title: &str, url: &str) -> SearchHit {
    hit_with_snippet(title, url, "")
}

pub fn hit_with_snippet(title: &str, url: &str, snippet: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
        published_at: None,
        source: "fake".to_string(),
    }
}

pub fn evidence_item(url: &str, credibility: u8) -> EvidenceItem {
    EvidenceItem {
        id: crate::types::content_id(&[url]),
        url: url.to_string(),
        publisher: "fake".to_string(),
        title: String::new(),
        snippet: String::new(),
        publication_date: None,
        rating: None,
        credibility_score: credibility,
        relevance_score: 0,
        support_type: SupportType::Neutral,
        source_type: EvidenceSource::SearchResult,
    }
}

pub fn sample_report(id: &str, text: &str, created_at: i64) -> FactCheckReport {
    FactCheckReport {
        id: id.to_string(),
        original_text: text.to_string(),
        final_score: 12,
        verdict: Verdict::False,
        evidence_strength: EvidenceStrength::Moderate,
        atomic_claims: vec![AtomicClaim {
            id: format!("{}-c0", id),
            text: text.to_string(),
            category: ClaimCategory::Factual,
            verifiability: Verifiability::High,
            priority: 5,
            entity_refs: Vec::new(),
        }],
        evidence: vec![evidence_item("https://www.reuters.com/fact-check/x", 95)],
        consensus: ConsensusAnalysis::default(),
        score_breakdown: ScoreBreakdown {
            entries: Vec::new(),
            final_score: 12,
        },
        temporal_summary: TemporalSummary {
            validations: Vec::new(),
            score: 100,
        },
        credibility_summary: CredibilitySummary::default(),
        reasoning: vec!["contradicted by reliable sources".to_string()],
        warnings: Vec::new(),
        metadata: ReportMetadata {
            method_used: MethodUsed {
                analysis: AnalysisMethod::Heuristic,
                evaluation: EvaluationMethod::Heuristic,
            },
            processing_time_ms: 42,
            sources_consulted: vec!["fake".to_string()],
            queries_executed: 2,
            phases: vec![Phase::Analyzing, Phase::Aggregating, Phase::Done],
            context_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap_or_default(),
            created_at,
        },
    }
}
