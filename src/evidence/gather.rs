use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, get_json, put_json, TtlClass};
use crate::cancel::CancelSignal;
use crate::credibility::{SourceCategory, SourceCredibilityScorer};
use crate::error::PipelineError;
use crate::evidence::normalize::{dedup_by_url, normalize_url};
use crate::traits::{CacheStore, FactClaimHit, FactClaimProvider, SearchHit, SearchProvider};
use crate::types::{content_id, ContentId, EvidenceItem, EvidenceSource, SearchQuery, SupportType};

/// Credibility every item carries until the scorer has seen it.
pub const PROVISIONAL_CREDIBILITY: u8 = 50;

#[derive(Debug, Clone, Copy)]
pub struct GatherSettings {
    pub max_concurrency: usize,
    pub max_results_per_query: usize,
    pub search_timeout: Duration,
}

impl Default for GatherSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            max_results_per_query: 5,
            search_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GatherOutcome {
    /// Deduplicated, credibility-scored, sorted.
    pub evidence: Vec<EvidenceItem>,
    pub warnings: Vec<String>,
    pub sources_consulted: Vec<String>,
    pub queries_executed: usize,
    pub cancelled: bool,
}

/// What one query produced across every provider it was routed to.
#[derive(Debug, Default)]
struct QueryResult {
    items: Vec<EvidenceItem>,
    failures: Vec<(String, PipelineError)>,
    providers: Vec<String>,
}

pub struct EvidenceGatherer {
    search: Vec<Arc<dyn SearchProvider>>,
    fact_claims: Vec<Arc<dyn FactClaimProvider>>,
    cache: Arc<dyn CacheStore>,
    scorer: Arc<SourceCredibilityScorer>,
    settings: GatherSettings,
}

impl EvidenceGatherer {
    pub fn new(
        search: Vec<Arc<dyn SearchProvider>>,
        fact_claims: Vec<Arc<dyn FactClaimProvider>>,
        cache: Arc<dyn CacheStore>,
        scorer: Arc<SourceCredibilityScorer>,
        settings: GatherSettings,
    ) -> Self {
        Self {
            search,
            fact_claims,
            cache,
            scorer,
            settings,
        }
    }

    pub fn provider_count(&self) -> usize {
        self.search.len() + self.fact_claims.len()
    }

    /// Execute `queries` in fixed-size batches. A batch is awaited in full
    /// before the next one starts; cancellation abandons the batch in flight.
    pub async fn gather(&self, queries: &[SearchQuery], cancel: &CancelSignal) -> GatherOutcome {
        let mut outcome = GatherOutcome::default();

        if self.provider_count() == 0 {
            outcome
                .warnings
                .push("no evidence providers configured; nothing was searched".to_string());
            return outcome;
        }

        let mut seen = HashSet::new();
        let queries: Vec<&SearchQuery> = queries.iter().filter(|q| seen.insert(q.id.clone())).collect();

        let batch_size = self.settings.max_concurrency.max(1);
        let mut results: HashMap<ContentId, QueryResult> = HashMap::new();

        for (batch_index, batch) in queries.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            debug!(batch = batch_index, size = batch.len(), "dispatching query batch");
            let pending = join_all(batch.iter().map(|q| self.run_query(q)));

            let batch_results = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(batch = batch_index, "cancelled during evidence gathering; abandoning batch");
                    outcome.cancelled = true;
                    break;
                }
                done = pending => done,
            };

            for (query, result) in batch.iter().zip(batch_results) {
                outcome.queries_executed += 1;
                results.entry(query.id.clone()).or_insert(result);
            }
        }

        let mut consulted = BTreeSet::new();
        let mut failures: BTreeMap<String, (usize, PipelineError)> = BTreeMap::new();
        let mut flattened = Vec::new();

        // Flatten in query rank order so dedup keeps the best-ranked copy
        for query in &queries {
            let Some(result) = results.remove(&query.id) else {
                continue;
            };
            consulted.extend(result.providers);
            for (provider, error) in result.failures {
                failures.entry(provider).or_insert((0, error)).0 += 1;
            }
            flattened.extend(result.items);
        }

        for (provider, (count, error)) in failures {
            outcome
                .warnings
                .push(format!("{} ({} failed call(s))", error, count));
            debug!(provider = %provider, count, "provider failures recorded");
        }

        let raw_count = flattened.len();
        outcome.evidence = finalize(dedup_by_url(flattened), &self.scorer);
        outcome.sources_consulted = consulted.into_iter().collect();

        if outcome.evidence.is_empty() && outcome.queries_executed > 0 {
            outcome
                .warnings
                .push("evidence gathering returned no usable results".to_string());
        }

        info!(
            queries = outcome.queries_executed,
            raw = raw_count,
            evidence = outcome.evidence.len(),
            cancelled = outcome.cancelled,
            "evidence gathered"
        );
        outcome
    }

    /// Route one query to every matching provider. Provider calls within a
    /// query run one after another so a batch never has more than
    /// `max_concurrency` calls outstanding.
    async fn run_query(&self, query: &SearchQuery) -> QueryResult {
        let mut result = QueryResult::default();
        let max = self.settings.max_results_per_query;

        if query.targets_fact_claims() {
            for provider in &self.fact_claims {
                result.providers.push(provider.name().to_string());
                match self.fact_claim_call(provider.as_ref(), &query.text, max).await {
                    Ok(hits) => result
                        .items
                        .extend(hits.into_iter().filter_map(from_fact_claim_hit)),
                    Err(e) => result.failures.push((provider.name().to_string(), e)),
                }
            }
        }

        let full_text = query.full_text();
        for provider in &self.search {
            let routed = query
                .target_source_types
                .iter()
                .any(|t| provider.accepts(*t));
            if !routed {
                continue;
            }
            result.providers.push(provider.name().to_string());
            match self.search_call(provider.as_ref(), &full_text, max).await {
                Ok(hits) => {
                    let kind = provider.kind();
                    result
                        .items
                        .extend(hits.into_iter().filter_map(|h| from_search_hit(h, kind)));
                }
                Err(e) => result.failures.push((provider.name().to_string(), e)),
            }
        }

        result
    }

    async fn search_call(
        &self,
        provider: &dyn SearchProvider,
        text: &str,
        max: usize,
    ) -> Result<Vec<SearchHit>, PipelineError> {
        let key = cache_key(&format!("search:{}", provider.name()), &format!("{}\u{1f}{}", text, max));
        if let Some(hits) = get_json::<Vec<SearchHit>>(self.cache.as_ref(), &key).await {
            return Ok(hits);
        }

        let timeout = self.settings.search_timeout;
        let hits = match tokio::time::timeout(timeout, provider.search(text, max)).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(provider = provider.name(), error = %e, "search failed");
                return Err(PipelineError::unavailable(provider.name(), e));
            }
            Err(_) => {
                warn!(provider = provider.name(), "search timed out");
                return Err(PipelineError::timed_out(provider.name(), timeout));
            }
        };

        put_json(self.cache.as_ref(), &key, &hits, TtlClass::Search).await;
        Ok(hits)
    }

    async fn fact_claim_call(
        &self,
        provider: &dyn FactClaimProvider,
        text: &str,
        max: usize,
    ) -> Result<Vec<FactClaimHit>, PipelineError> {
        let key = cache_key(&format!("claims:{}", provider.name()), &format!("{}\u{1f}{}", text, max));
        if let Some(hits) = get_json::<Vec<FactClaimHit>>(self.cache.as_ref(), &key).await {
            return Ok(hits);
        }

        let timeout = self.settings.search_timeout;
        let hits = match tokio::time::timeout(timeout, provider.search_claims(text, max)).await {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(provider = provider.name(), error = %e, "claim search failed");
                return Err(PipelineError::unavailable(provider.name(), e));
            }
            Err(_) => {
                warn!(provider = provider.name(), "claim search timed out");
                return Err(PipelineError::timed_out(provider.name(), timeout));
            }
        };

        put_json(self.cache.as_ref(), &key, &hits, TtlClass::Search).await;
        Ok(hits)
    }
}

fn from_search_hit(hit: SearchHit, kind: EvidenceSource) -> Option<EvidenceItem> {
    let key = normalize_url(&hit.url)?;
    Some(EvidenceItem {
        id: content_id(&[&key]),
        publication_date: hit.published_at.as_deref().and_then(parse_published),
        title: clean_text(&hit.title),
        snippet: clean_text(&hit.snippet),
        publisher: hit.source,
        url: hit.url,
        rating: None,
        credibility_score: PROVISIONAL_CREDIBILITY,
        relevance_score: 0,
        support_type: SupportType::Neutral,
        source_type: kind,
    })
}

fn from_fact_claim_hit(hit: FactClaimHit) -> Option<EvidenceItem> {
    let key = normalize_url(&hit.url)?;
    let claim_text = clean_text(&hit.claim_text);
    Some(EvidenceItem {
        id: content_id(&[&key]),
        publication_date: hit.review_date.as_deref().and_then(parse_published),
        title: claim_text.clone(),
        snippet: format!("{} rated \"{}\" as {}", hit.reviewer, claim_text, hit.rating),
        publisher: hit.reviewer,
        url: hit.url,
        rating: Some(hit.rating),
        credibility_score: PROVISIONAL_CREDIBILITY,
        relevance_score: 0,
        support_type: SupportType::Neutral,
        source_type: EvidenceSource::FactClaim,
    })
}

/// Flatten markup when present, then collapse whitespace.
fn clean_text(raw: &str) -> String {
    let text = if raw.contains('<') {
        html2text::from_read(raw.as_bytes(), 10_000).unwrap_or_else(|_| raw.to_string())
    } else {
        raw.to_string()
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Provider dates arrive as RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`
/// or `Mon D, YYYY`.
pub fn parse_published(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    ["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Apply credibility scores, re-tag academic web results, and sort.
pub fn finalize(mut items: Vec<EvidenceItem>, scorer: &SourceCredibilityScorer) -> Vec<EvidenceItem> {
    for item in &mut items {
        let credibility = scorer.score(&item.url);
        item.credibility_score = credibility.credibility_score;
        if item.source_type == EvidenceSource::SearchResult
            && credibility.category == SourceCategory::Academic
        {
            item.source_type = EvidenceSource::Academic;
        }
    }
    sort_evidence(&mut items);
    items
}

/// Credibility desc, relevance desc, then normalized URL for a total order.
pub fn sort_evidence(items: &mut [EvidenceItem]) {
    items.sort_by(|a, b| {
        b.credibility_score
            .cmp(&a.credibility_score)
            .then(b.relevance_score.cmp(&a.relevance_score))
            .then_with(|| url_order(a, b))
    });
}

fn url_order(a: &EvidenceItem, b: &EvidenceItem) -> Ordering {
    normalize_url(&a.url).cmp(&normalize_url(&b.url))
}
