//! Collaborator seams. Everything outside the pipeline sits behind one of
//! these traits so tests can substitute scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::TtlClass;
use crate::types::{EvidenceSource, QueryTarget};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

/// Generative-text service. The returned text is untrusted: it may or may
/// not be JSON, and callers own all parsing.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, config: GenerationConfig) -> anyhow::Result<String>;
}

/// One row from a web or news search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default)]
    pub published_at: Option<String>,
    /// Publisher as reported by the provider.
    pub source: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Evidence family produced by this provider.
    fn kind(&self) -> EvidenceSource;

    /// Whether queries aimed at `target` should be routed here.
    fn accepts(&self, target: QueryTarget) -> bool {
        target != QueryTarget::FactClaim
    }

    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// One reviewed claim from a fact-claim database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactClaimHit {
    pub claim_text: String,
    pub rating: String,
    pub reviewer: String,
    pub url: String,
    #[serde(default)]
    pub review_date: Option<String>,
}

#[async_trait]
pub trait FactClaimProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search_claims(&self, query: &str, max_results: usize)
        -> anyhow::Result<Vec<FactClaimHit>>;
}

/// Content-hash keyed cache in front of external calls.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `None` on miss or expiry.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: TtlClass);
}

/// Long-term report storage.
#[async_trait]
pub trait ReportPersistence: Send + Sync {
    /// Store `payload` under `key`; returns a locator for the stored blob.
    async fn put(&self, key: &str, payload: Vec<u8>) -> anyhow::Result<String>;

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
}
