//! The fact-check state machine.
//!
//! ```text
//! Analyzing → Querying → Gathering → Scoring → Aggregating → Done
//!      └──────────┴───────────┴──────────┴──→ Failed ──→ Done
//! ```
//!
//! Phases run strictly in sequence; only Gathering fans out. Cancellation
//! from any phase jumps straight to Aggregating, which works from whatever
//! the run has collected using local computation only. Collaborator calls
//! run on their own tasks, so a panic in any of them lands in Failed.

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::analysis::ClaimAnalyzer;
use crate::cache::{cache_key, get_json, normalize_text, put_json, TtlClass};
use crate::cancel::CancelSignal;
use crate::credibility::SourceCredibilityScorer;
use crate::error::PipelineError;
use crate::evidence::evaluate::{consensus, Evaluated, EvidenceEvaluator};
use crate::evidence::gather::{sort_evidence, EvidenceGatherer};
use crate::query::QuerySynthesizer;
use crate::scoring::ScoreAggregator;
use crate::state::PipelineConfig;
use crate::store::spawn_persist;
use crate::temporal::TemporalValidator;
use crate::traits::{CacheStore, FactClaimProvider, ReportPersistence, SearchProvider, TextGenerator};
use crate::types::{
    content_id, AnalysisMethod, ClaimAnalysis, EvaluationMethod, EvidenceItem, FactCheckReport,
    MethodUsed, Phase, ReportMetadata, SearchQuery, TemporalSummary, TemporalValidation, Verdict,
    MAX_CLAIM_CHARS,
};

/// External services the pipeline talks to. Absent providers simply
/// contribute nothing.
pub struct Collaborators {
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub search: Vec<Arc<dyn SearchProvider>>,
    pub fact_claims: Vec<Arc<dyn FactClaimProvider>>,
    pub cache: Arc<dyn CacheStore>,
    pub persistence: Option<Arc<dyn ReportPersistence>>,
}

#[derive(Debug, Clone)]
pub struct FactCheckRequest {
    pub text: String,
    /// Date claims are judged against; today when absent.
    pub context_date: Option<NaiveDate>,
}

impl FactCheckRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context_date: None,
        }
    }

    pub fn with_context_date(mut self, date: NaiveDate) -> Self {
        self.context_date = Some(date);
        self
    }
}

/// Mutable state of one run. Each phase fills in its part.
struct Run {
    text: String,
    context_date: NaiveDate,
    phases: Vec<Phase>,
    warnings: Vec<String>,
    analysis: Option<ClaimAnalysis>,
    queries: Vec<SearchQuery>,
    evidence: Vec<EvidenceItem>,
    sources_consulted: Vec<String>,
    queries_executed: usize,
    evaluated: Option<Evaluated>,
    temporal: Option<Vec<TemporalValidation>>,
    cancelled: bool,
    failure: Option<String>,
}

impl Run {
    fn new(text: &str, context_date: NaiveDate) -> Self {
        Self {
            text: text.to_string(),
            context_date,
            phases: Vec::new(),
            warnings: Vec::new(),
            analysis: None,
            queries: Vec::new(),
            evidence: Vec::new(),
            sources_consulted: Vec::new(),
            queries_executed: 0,
            evaluated: None,
            temporal: None,
            cancelled: false,
            failure: None,
        }
    }

    fn cancelled_in(&mut self, phase: Phase) -> Phase {
        if !self.cancelled {
            self.cancelled = true;
            warn!(phase = %phase, "run cancelled");
            self.warnings
                .push(format!("cancelled during {}; report built from partial results", phase));
        }
        Phase::Aggregating
    }

    fn fail(&mut self, phase: Phase, reason: String) -> Phase {
        error!(phase = %phase, reason = %reason, "phase failed");
        self.warnings.push(format!("{} failed: {}", phase, reason));
        self.failure = Some(reason);
        Phase::Failed
    }
}

pub struct Orchestrator {
    analyzer: Arc<ClaimAnalyzer>,
    synthesizer: QuerySynthesizer,
    gatherer: Arc<EvidenceGatherer>,
    evaluator: Arc<EvidenceEvaluator>,
    aggregator: ScoreAggregator,
    scorer: Arc<SourceCredibilityScorer>,
    temporal: TemporalValidator,
    cache: Arc<dyn CacheStore>,
    persistence: Option<Arc<dyn ReportPersistence>>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(config: &PipelineConfig, collaborators: Collaborators) -> Self {
        let scorer = Arc::new(SourceCredibilityScorer::new());
        let evaluation_generator = collaborators
            .generator
            .clone()
            .filter(|_| config.use_llm_evaluation);

        Self {
            analyzer: Arc::new(ClaimAnalyzer::new(collaborators.generator, config.llm_timeout)),
            synthesizer: QuerySynthesizer::new(config.max_queries),
            gatherer: Arc::new(EvidenceGatherer::new(
                collaborators.search,
                collaborators.fact_claims,
                collaborators.cache.clone(),
                scorer.clone(),
                config.gather_settings(),
            )),
            evaluator: Arc::new(EvidenceEvaluator::new(evaluation_generator, config.llm_timeout)),
            aggregator: ScoreAggregator::new(config.weights),
            scorer,
            temporal: TemporalValidator::default(),
            cache: collaborators.cache,
            persistence: collaborators.persistence,
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    /// Run one fact check. Only [`PipelineError::InvalidInput`] is ever
    /// returned; every other problem degrades the report instead.
    pub async fn check(
        &self,
        request: FactCheckRequest,
        cancel: CancelSignal,
    ) -> Result<FactCheckReport, PipelineError> {
        let text = validate_input(&request.text)?;
        let context_date = request
            .context_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let report_key = cache_key(&format!("report:{}", context_date), text);
        if let Some(report) = get_json::<FactCheckReport>(self.cache.as_ref(), &report_key).await {
            info!(report_id = %report.id, "report served from cache");
            return Ok(report);
        }

        let started = Instant::now();
        let mut run = Run::new(text, context_date);
        let mut phase = Phase::Analyzing;
        info!(chars = text.chars().count(), context_date = %context_date, "fact check started");

        let report = loop {
            run.phases.push(phase);
            info!(phase = %phase, "entering phase");
            phase = match phase {
                Phase::Analyzing => self.analyze_phase(&mut run, &cancel).await,
                Phase::Querying => self.query_phase(&mut run, &cancel),
                Phase::Gathering => self.gather_phase(&mut run, &cancel).await,
                Phase::Scoring => self.score_phase(&mut run, &cancel).await,
                Phase::Aggregating | Phase::Failed | Phase::Done => {
                    break self.assemble(&mut run, started);
                }
            };
        };

        if !run.cancelled && run.failure.is_none() {
            put_json(self.cache.as_ref(), &report_key, &report, TtlClass::Report).await;
        }
        if let Some(persistence) = &self.persistence {
            let handle = spawn_persist(persistence.clone(), &report);
            let mut pending = self.pending_writes.lock().await;
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }

        info!(
            report_id = %report.id,
            final_score = report.final_score,
            verdict = %report.verdict,
            evidence = report.evidence.len(),
            warnings = report.warnings.len(),
            elapsed_ms = report.metadata.processing_time_ms,
            "fact check complete"
        );
        Ok(report)
    }

    /// Wait for detached report writes. Run before the runtime shuts down.
    pub async fn flush_persistence(&self) {
        let handles = std::mem::take(&mut *self.pending_writes.lock().await);
        if handles.is_empty() {
            return;
        }
        debug!(count = handles.len(), "waiting for report writes");
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!(error = %e, "report write task aborted");
            }
        }
    }

    async fn analyze_phase(&self, run: &mut Run, cancel: &CancelSignal) -> Phase {
        if cancel.is_cancelled() {
            return run.cancelled_in(Phase::Analyzing);
        }

        let key = cache_key("analysis", &run.text);
        if let Some(analysis) = get_json::<ClaimAnalysis>(self.cache.as_ref(), &key).await {
            run.analysis = Some(analysis);
            return Phase::Querying;
        }

        let analyzer = self.analyzer.clone();
        let text = run.text.clone();
        let task = tokio::spawn(async move { analyzer.analyze(&text).await });
        let analyzed = match isolate(task, cancel).await {
            None => return run.cancelled_in(Phase::Analyzing),
            Some(Err(e)) => return run.fail(Phase::Analyzing, format!("claim analysis aborted: {}", e)),
            Some(Ok(analyzed)) => analyzed,
        };

        // Heuristic output is cheap to recompute and may reflect an outage
        if analyzed.analysis.method == AnalysisMethod::Generative {
            put_json(self.cache.as_ref(), &key, &analyzed.analysis, TtlClass::Analysis).await;
        }
        run.warnings.extend(analyzed.warnings);
        run.analysis = Some(analyzed.analysis);
        Phase::Querying
    }

    fn query_phase(&self, run: &mut Run, cancel: &CancelSignal) -> Phase {
        if cancel.is_cancelled() {
            return run.cancelled_in(Phase::Querying);
        }

        if let Some(analysis) = &run.analysis {
            run.queries = self
                .synthesizer
                .synthesize(&analysis.atomic_claims, &analysis.entities);
        }
        info!(queries = run.queries.len(), "queries ready");

        if run.queries.is_empty() {
            warn!("no searchable queries derived from claim");
            run.warnings
                .push("no searchable queries could be derived from the claim".to_string());
            return Phase::Scoring;
        }
        Phase::Gathering
    }

    async fn gather_phase(&self, run: &mut Run, cancel: &CancelSignal) -> Phase {
        if cancel.is_cancelled() {
            return run.cancelled_in(Phase::Gathering);
        }

        // Provider code runs on its own task so a panic there fails the
        // phase instead of the caller
        let gatherer = self.gatherer.clone();
        let queries = run.queries.clone();
        let signal = cancel.clone();
        let joined = tokio::spawn(async move { gatherer.gather(&queries, &signal).await }).await;

        match joined {
            Ok(outcome) => {
                run.warnings.extend(outcome.warnings);
                run.sources_consulted = outcome.sources_consulted;
                run.queries_executed = outcome.queries_executed;
                run.evidence = outcome.evidence;
                if outcome.cancelled {
                    return run.cancelled_in(Phase::Gathering);
                }
                Phase::Scoring
            }
            Err(e) => run.fail(Phase::Gathering, format!("evidence gathering aborted: {}", e)),
        }
    }

    async fn score_phase(&self, run: &mut Run, cancel: &CancelSignal) -> Phase {
        let key = cache_key(&format!("temporal:{}", run.context_date), &run.text);
        let validations = match get_json::<Vec<TemporalValidation>>(self.cache.as_ref(), &key).await {
            Some(v) => v,
            None => {
                let v = self.temporal.validate(&run.text, run.context_date);
                put_json(self.cache.as_ref(), &key, &v, TtlClass::Temporal).await;
                v
            }
        };
        run.temporal = Some(validations);

        if cancel.is_cancelled() {
            return run.cancelled_in(Phase::Scoring);
        }

        let evaluator = self.evaluator.clone();
        let text = run.text.clone();
        let evidence = run.evidence.clone();
        let task = tokio::spawn(async move { evaluator.evaluate(&text, evidence).await });
        let mut evaluated = match isolate(task, cancel).await {
            None => return run.cancelled_in(Phase::Scoring),
            Some(Err(e)) => return run.fail(Phase::Scoring, format!("evidence evaluation aborted: {}", e)),
            Some(Ok(evaluated)) => evaluated,
        };

        sort_evidence(&mut evaluated.evidence);
        run.warnings.append(&mut evaluated.warnings);
        run.evaluated = Some(evaluated);
        Phase::Aggregating
    }

    /// Build the report from whatever the run holds. Anything still missing
    /// is computed locally; no external calls happen here.
    fn assemble(&self, run: &mut Run, started: Instant) -> FactCheckReport {
        run.phases.push(Phase::Done);

        let analysis = run
            .analysis
            .take()
            .unwrap_or_else(|| ClaimAnalyzer::heuristic(&run.text));

        let validations = match run.temporal.take() {
            Some(v) => v,
            None => self.temporal.validate(&run.text, run.context_date),
        };
        let temporal_score = TemporalValidator::score(&validations);

        let evaluated = match run.evaluated.take() {
            Some(e) => e,
            None => {
                let mut evidence = EvidenceEvaluator::heuristic(&run.text, std::mem::take(&mut run.evidence));
                sort_evidence(&mut evidence);
                Evaluated {
                    consensus: consensus(&evidence),
                    evidence,
                    method: EvaluationMethod::Heuristic,
                    warnings: Vec::new(),
                }
            }
        };

        let aggregate = self.aggregator.aggregate(
            &evaluated.evidence,
            &evaluated.consensus,
            temporal_score,
            &self.scorer,
        );

        let mut reasoning = aggregate.reasoning;
        let mut warnings = std::mem::take(&mut run.warnings);
        if let Some(reason) = aggregate.insufficiency {
            warnings.push(reason);
        }

        let verdict = match &run.failure {
            Some(reason) => {
                reasoning.push(format!("pipeline failure ({}); verdict reported as {}", reason, Verdict::Unverifiable));
                Verdict::Unverifiable
            }
            None => aggregate.verdict,
        };

        FactCheckReport {
            id: content_id(&[&normalize_text(&run.text), &run.context_date.to_string()]),
            original_text: run.text.clone(),
            final_score: aggregate.final_score,
            verdict,
            evidence_strength: aggregate.evidence_strength,
            atomic_claims: analysis.atomic_claims,
            evidence: evaluated.evidence,
            consensus: evaluated.consensus,
            score_breakdown: aggregate.breakdown,
            temporal_summary: TemporalSummary {
                validations,
                score: temporal_score,
            },
            credibility_summary: aggregate.credibility_summary,
            reasoning,
            warnings,
            metadata: ReportMetadata {
                method_used: MethodUsed {
                    analysis: analysis.method,
                    evaluation: evaluated.method,
                },
                processing_time_ms: started.elapsed().as_millis() as u64,
                sources_consulted: std::mem::take(&mut run.sources_consulted),
                queries_executed: run.queries_executed,
                phases: std::mem::take(&mut run.phases),
                context_date: run.context_date,
                created_at: Utc::now().timestamp_millis(),
            },
        }
    }
}

/// Await a collaborator task unless the run is cancelled first, in which case
/// the task is aborted and `None` returned.
async fn isolate<T>(mut task: JoinHandle<T>, cancel: &CancelSignal) -> Option<Result<T, JoinError>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            task.abort();
            None
        }
        joined = &mut task => Some(joined),
    }
}

fn validate_input(text: &str) -> Result<&str, PipelineError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidInput("claim text is empty".to_string()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_CLAIM_CHARS {
        return Err(PipelineError::InvalidInput(format!(
            "claim text is {} characters; the limit is {}",
            chars, MAX_CLAIM_CHARS
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::MemoryCache;
    use crate::cancel::cancel_pair;
    use crate::testing::{hit_with_snippet, FakeFactClaims, FakeSearch, RecordingPersistence, ScriptedGenerator};
    use crate::traits::FactClaimHit;
    use crate::types::{DateType, EvidenceSource, EvidenceStrength};
    use pretty_assertions::assert_eq;

    fn snopes_false() -> FactClaimHit {
        FactClaimHit {
            claim_text: "The moon is made of cheese".to_string(),
            rating: "False".to_string(),
            reviewer: "Snopes".to_string(),
            url: "https://www.snopes.com/fact-check/moon-cheese/".to_string(),
            review_date: Some("2024-01-05".to_string()),
        }
    }

    fn moon_search() -> FakeSearch {
        FakeSearch::new("web").with_hits(
            "moon made cheese",
            vec![
                hit_with_snippet(
                    "Is the moon made of cheese?",
                    "https://www.nasa.gov/moon/",
                    "That is a myth; the moon is made of rock.",
                ),
                hit_with_snippet(
                    "Fact check: the moon is not made of cheese",
                    "https://www.reuters.com/fact-check/moon",
                    "There is no evidence the moon is made of cheese.",
                ),
            ],
        )
    }

    fn orchestrator(collaborators: Collaborators) -> Orchestrator {
        Orchestrator::new(&PipelineConfig::default(), collaborators)
    }

    fn collaborators(
        search: Vec<Arc<dyn SearchProvider>>,
        fact_claims: Vec<Arc<dyn FactClaimProvider>>,
    ) -> Collaborators {
        Collaborators {
            generator: None,
            search,
            fact_claims,
            cache: Arc::new(MemoryCache::default()),
            persistence: None,
        }
    }

    fn moon() -> FactCheckRequest {
        FactCheckRequest::new("The moon is made of cheese.")
            .with_context_date(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap())
    }

    #[tokio::test]
    async fn test_contradicted_claim_end_to_end() {
        let search = Arc::new(moon_search());
        let facts = Arc::new(FakeFactClaims::new("facts").with_hit(snopes_false()));
        let o = orchestrator(collaborators(vec![search], vec![facts]));

        let report = o.check(moon(), CancelSignal::never()).await.unwrap();

        assert!(report.final_score <= 10, "final {}", report.final_score);
        assert!(matches!(report.verdict, Verdict::False | Verdict::PantsOnFire));
        assert_eq!(report.evidence_strength, EvidenceStrength::Moderate);
        assert_eq!(report.consensus.contradicting_count, 3);
        assert_eq!(report.consensus.supporting_count, 0);
        assert_eq!(
            report.metadata.phases,
            vec![
                Phase::Analyzing,
                Phase::Querying,
                Phase::Gathering,
                Phase::Scoring,
                Phase::Aggregating,
                Phase::Done
            ]
        );
        let scores: Vec<u8> = report.evidence.iter().map(|e| e.credibility_score).collect();
        assert_eq!(scores, vec![95, 92, 88]);
        assert_eq!(report.evidence[2].source_type, EvidenceSource::FactClaim);
        assert_eq!(report.metadata.sources_consulted, vec!["facts", "web"]);
        assert_eq!(report.metadata.method_used.analysis, AnalysisMethod::Heuristic);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert!(report.temporal_summary.validations.is_empty());
        assert_eq!(report.temporal_summary.score, 100);
    }

    #[tokio::test]
    async fn test_all_providers_down_degrades_to_unverifiable() {
        let search = Arc::new(FakeSearch::new("web").failing());
        let facts = Arc::new(FakeFactClaims::new("facts").failing());
        let o = orchestrator(collaborators(vec![search], vec![facts]));

        let report = o.check(moon(), CancelSignal::never()).await.unwrap();
        assert_eq!(report.verdict, Verdict::Unverifiable);
        assert!(report.evidence.is_empty());
        assert!(report.warnings.iter().any(|w| w.contains("unavailable")));
        assert_eq!(report.evidence_strength, EvidenceStrength::Insufficient);
    }

    #[tokio::test]
    async fn test_scenario_a_temporal_validation() {
        let o = orchestrator(collaborators(vec![], vec![]));
        let request = FactCheckRequest::new("In August 2025, inflation fell to 3%.")
            .with_context_date(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());

        let report = o.check(request, CancelSignal::never()).await.unwrap();
        let v = &report.temporal_summary.validations;
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].date_type, Some(DateType::Present));
        assert!(v[0].is_valid);
        assert!(v[0].confidence >= 90);
        assert_eq!(report.verdict, Verdict::Unverifiable);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let o = orchestrator(collaborators(vec![], vec![]));
        let empty = o.check(FactCheckRequest::new("   "), CancelSignal::never()).await;
        assert!(matches!(empty, Err(PipelineError::InvalidInput(_))));

        let long = "a".repeat(MAX_CLAIM_CHARS + 1);
        let oversized = o.check(FactCheckRequest::new(long), CancelSignal::never()).await;
        assert!(matches!(oversized, Err(PipelineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_warm_cache_is_idempotent() {
        let search = Arc::new(moon_search());
        let facts = Arc::new(FakeFactClaims::new("facts").with_hit(snopes_false()));
        let o = orchestrator(collaborators(vec![search.clone()], vec![facts.clone()]));

        let first = o.check(moon(), CancelSignal::never()).await.unwrap();
        let calls = (search.calls(), facts.calls());
        let second = o.check(moon(), CancelSignal::never()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!((search.calls(), facts.calls()), calls);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_calls() {
        let generator = Arc::new(ScriptedGenerator::replies(vec!["{}"]));
        let search = Arc::new(moon_search());
        let mut c = collaborators(vec![search.clone()], vec![]);
        c.generator = Some(generator.clone());
        let o = orchestrator(c);

        let (handle, signal) = cancel_pair();
        handle.cancel();
        let report = o.check(moon(), signal).await.unwrap();

        assert_eq!(generator.calls(), 0);
        assert_eq!(search.calls(), 0);
        assert_eq!(
            report.metadata.phases,
            vec![Phase::Analyzing, Phase::Aggregating, Phase::Done]
        );
        assert!(report.warnings[0].contains("cancelled during analyzing"));
        assert_eq!(report.verdict, Verdict::Unverifiable);
        assert_eq!(report.atomic_claims.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_gathering_keeps_partial_evidence() {
        let fast = Arc::new(FakeFactClaims::new("facts").with_hit(snopes_false()));
        let slow = Arc::new(moon_search().with_delay(Duration::from_secs(10)));
        let mut config = PipelineConfig::default();
        config.max_concurrency = 1;
        config.search_timeout = Duration::from_secs(60);
        let o = Orchestrator::new(&config, collaborators(vec![slow], vec![fast]));

        let (handle, signal) = cancel_pair();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });
        let report = o.check(moon(), signal).await.unwrap();

        assert_eq!(report.evidence.len(), 1);
        assert_eq!(report.evidence[0].support_type, crate::types::SupportType::Contradicting);
        assert!(report.warnings.iter().any(|w| w.contains("cancelled during gathering")));
        assert_eq!(
            report.metadata.phases,
            vec![Phase::Analyzing, Phase::Querying, Phase::Gathering, Phase::Aggregating, Phase::Done]
        );
        assert_eq!(report.metadata.method_used.evaluation, EvaluationMethod::Heuristic);
    }

    #[tokio::test]
    async fn test_provider_panic_fails_then_completes() {
        let search = Arc::new(FakeSearch::new("web").panicking());
        let o = orchestrator(collaborators(vec![search], vec![]));

        let report = o.check(moon(), CancelSignal::never()).await.unwrap();
        assert_eq!(
            report.metadata.phases,
            vec![Phase::Analyzing, Phase::Querying, Phase::Gathering, Phase::Failed, Phase::Done]
        );
        assert_eq!(report.verdict, Verdict::Unverifiable);
        assert!(report.warnings.iter().any(|w| w.contains("evidence gathering aborted")));
    }

    #[tokio::test]
    async fn test_generator_panic_during_analysis_fails_then_completes() {
        let generator = Arc::new(ScriptedGenerator::replies(vec!["{}"]).panicking_on(0));
        let search = Arc::new(moon_search());
        let mut c = collaborators(vec![search.clone()], vec![]);
        c.generator = Some(generator);
        let o = orchestrator(c);

        let report = o.check(moon(), CancelSignal::never()).await.unwrap();
        assert_eq!(
            report.metadata.phases,
            vec![Phase::Analyzing, Phase::Failed, Phase::Done]
        );
        assert_eq!(report.verdict, Verdict::Unverifiable);
        assert_eq!(search.calls(), 0);
        assert_eq!(report.atomic_claims.len(), 1);
        assert!(report.warnings.iter().any(|w| w.contains("claim analysis aborted")));
    }

    #[tokio::test]
    async fn test_generator_panic_during_scoring_keeps_evidence() {
        let analysis = r#"{"atomicClaims": [{"text": "The moon is made of cheese", "category": "factual",
            "verifiability": "high", "priority": 9}], "entities": [], "complexity": "simple"}"#;
        let generator = Arc::new(ScriptedGenerator::replies(vec![analysis]).panicking_on(1));
        let mut c = collaborators(vec![Arc::new(moon_search())], vec![]);
        c.generator = Some(generator.clone());
        let o = orchestrator(c);

        let report = o.check(moon(), CancelSignal::never()).await.unwrap();
        assert_eq!(generator.calls(), 2);
        assert_eq!(
            report.metadata.phases,
            vec![
                Phase::Analyzing,
                Phase::Querying,
                Phase::Gathering,
                Phase::Scoring,
                Phase::Failed,
                Phase::Done
            ]
        );
        assert_eq!(report.verdict, Verdict::Unverifiable);
        assert_eq!(report.evidence.len(), 2);
        assert_eq!(report.metadata.method_used.evaluation, EvaluationMethod::Heuristic);
        assert!(report.warnings.iter().any(|w| w.contains("evidence evaluation aborted")));
    }

    #[tokio::test]
    async fn test_failed_run_is_not_report_cached() {
        let generator = Arc::new(ScriptedGenerator::replies(vec!["{}"]).panicking_on(0));
        let mut c = collaborators(vec![], vec![]);
        c.generator = Some(generator.clone());
        let o = orchestrator(c);

        o.check(moon(), CancelSignal::never()).await.unwrap();
        o.check(moon(), CancelSignal::never()).await.unwrap();
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistence_is_detached() {
        let sink = Arc::new(RecordingPersistence::new().with_delay(Duration::from_secs(5)));
        let mut c = collaborators(vec![Arc::new(moon_search())], vec![]);
        c.persistence = Some(sink.clone());
        let o = orchestrator(c);

        let report = o.check(moon(), CancelSignal::never()).await.unwrap();
        assert_eq!(sink.writes(), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sink.keys(), vec![report.id.clone()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_waits_for_pending_writes() {
        let sink = Arc::new(RecordingPersistence::new().with_delay(Duration::from_secs(5)));
        let mut c = collaborators(vec![], vec![]);
        c.persistence = Some(sink.clone());
        let o = orchestrator(c);

        o.check(moon(), CancelSignal::never()).await.unwrap();
        o.flush_persistence().await;
        assert_eq!(sink.writes(), 1);
    }

    #[tokio::test]
    async fn test_generator_drives_analysis_and_evaluation() {
        let analysis = r#"{"atomicClaims": [{"text": "The moon is made of cheese", "category": "factual",
            "verifiability": "high", "priority": 9}], "entities": [], "complexity": "simple"}"#;
        let evaluation = r#"[{"index": 0, "supportType": "contradicting", "relevance": 95},
            {"index": 1, "supportType": "contradicting", "relevance": 90}]"#;
        let generator = Arc::new(ScriptedGenerator::replies(vec![analysis, evaluation]));
        let mut c = collaborators(vec![Arc::new(moon_search())], vec![]);
        c.generator = Some(generator.clone());
        let o = orchestrator(c);

        let report = o.check(moon(), CancelSignal::never()).await.unwrap();
        assert_eq!(generator.calls(), 2);
        assert_eq!(report.metadata.method_used.analysis, AnalysisMethod::Generative);
        assert_eq!(report.metadata.method_used.evaluation, EvaluationMethod::Generative);
        assert_eq!(report.atomic_claims[0].priority, 9);
        assert!(report.final_score <= 10);
    }
}
