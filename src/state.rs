use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cache::TtlPolicy;
use crate::evidence::gather::GatherSettings;
use crate::orchestrator::Orchestrator;
use crate::scoring::ScoringWeights;
use crate::store::ReportStore;

/// Pipeline tuning. Every field has a default; `from_env` overrides from
/// `CLAIMCHECK_*` variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_queries: usize,
    pub max_concurrency: usize,
    pub max_results_per_query: usize,
    pub llm_timeout: Duration,
    pub search_timeout: Duration,
    pub weights: ScoringWeights,
    pub ttl: TtlPolicy,
    pub use_llm_evaluation: bool,
    pub data_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_queries: 10,
            max_concurrency: 3,
            max_results_per_query: 5,
            llm_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(15),
            weights: ScoringWeights::default(),
            ttl: TtlPolicy::default(),
            use_llm_evaluation: true,
            data_dir: PathBuf::from("./data/reports"),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| dotenv::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values keep the
    /// default and log a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let weights = match get("CLAIMCHECK_WEIGHTS") {
            Some(raw) => ScoringWeights::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "invalid CLAIMCHECK_WEIGHTS, using defaults");
                defaults.weights
            }),
            None => defaults.weights,
        };

        Self {
            max_queries: parsed(get("CLAIMCHECK_MAX_QUERIES"), "CLAIMCHECK_MAX_QUERIES", defaults.max_queries).max(1),
            max_concurrency: parsed(get("CLAIMCHECK_CONCURRENCY"), "CLAIMCHECK_CONCURRENCY", defaults.max_concurrency).max(1),
            max_results_per_query: parsed(
                get("CLAIMCHECK_RESULTS_PER_QUERY"),
                "CLAIMCHECK_RESULTS_PER_QUERY",
                defaults.max_results_per_query,
            )
            .max(1),
            llm_timeout: Duration::from_secs(parsed(
                get("CLAIMCHECK_LLM_TIMEOUT_SECS"),
                "CLAIMCHECK_LLM_TIMEOUT_SECS",
                defaults.llm_timeout.as_secs(),
            )),
            search_timeout: Duration::from_secs(parsed(
                get("CLAIMCHECK_SEARCH_TIMEOUT_SECS"),
                "CLAIMCHECK_SEARCH_TIMEOUT_SECS",
                defaults.search_timeout.as_secs(),
            )),
            weights,
            ttl: defaults.ttl,
            use_llm_evaluation: parsed(
                get("CLAIMCHECK_LLM_EVALUATION"),
                "CLAIMCHECK_LLM_EVALUATION",
                defaults.use_llm_evaluation,
            ),
            data_dir: get("CLAIMCHECK_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
        }
    }

    pub fn gather_settings(&self) -> GatherSettings {
        GatherSettings {
            max_concurrency: self.max_concurrency,
            max_results_per_query: self.max_results_per_query,
            search_timeout: self.search_timeout,
        }
    }
}

fn parsed<T: FromStr + Copy>(raw: Option<String>, name: &str, default: T) -> T {
    match raw {
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %v, "unparseable setting, using default");
            default
        }),
        None => default,
    }
}

/// Everything the CLI needs after startup.
pub struct AppState {
    pub config: PipelineConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<ReportStore>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> PipelineConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let c = from_map(&[]);
        assert_eq!(c.max_queries, 10);
        assert_eq!(c.max_concurrency, 3);
        assert_eq!(c.max_results_per_query, 5);
        assert_eq!(c.llm_timeout, Duration::from_secs(30));
        assert_eq!(c.search_timeout, Duration::from_secs(15));
        assert_eq!(c.weights, ScoringWeights::default());
        assert!(c.use_llm_evaluation);
        assert_eq!(c.data_dir, PathBuf::from("./data/reports"));
    }

    #[test]
    fn test_overrides() {
        let c = from_map(&[
            ("CLAIMCHECK_MAX_QUERIES", "12"),
            ("CLAIMCHECK_CONCURRENCY", "5"),
            ("CLAIMCHECK_WEIGHTS", "0.6, 0.2, 0.2"),
            ("CLAIMCHECK_LLM_EVALUATION", "false"),
            ("CLAIMCHECK_SEARCH_TIMEOUT_SECS", "10"),
            ("CLAIMCHECK_DATA_DIR", "/tmp/reports"),
        ]);
        assert_eq!(c.max_queries, 12);
        assert_eq!(c.max_concurrency, 5);
        assert_eq!(c.weights.evidence, 0.6);
        assert!(!c.use_llm_evaluation);
        assert_eq!(c.search_timeout, Duration::from_secs(10));
        assert_eq!(c.data_dir, PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let c = from_map(&[
            ("CLAIMCHECK_MAX_QUERIES", "lots"),
            ("CLAIMCHECK_CONCURRENCY", "0"),
            ("CLAIMCHECK_WEIGHTS", "1,2"),
        ]);
        assert_eq!(c.max_queries, 10);
        assert_eq!(c.max_concurrency, 1);
        assert_eq!(c.weights, ScoringWeights::default());
    }
}
