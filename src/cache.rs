//! In-memory TTL cache keyed by content hash.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::traits::CacheStore;

/// Named expiry policy for a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlClass {
    /// Live search results.
    Search,
    /// Claim decomposition and evidence evaluation output.
    Analysis,
    /// Temporal validation of a claim against a context date.
    Temporal,
    /// Finished reports.
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub search: Duration,
    pub analysis: Duration,
    pub temporal: Duration,
    pub report: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(60 * 60),
            analysis: Duration::from_secs(6 * 60 * 60),
            temporal: Duration::from_secs(24 * 60 * 60),
            report: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Search => self.search,
            TtlClass::Analysis => self.analysis,
            TtlClass::Temporal => self.temporal,
            TtlClass::Report => self.report,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Vec<u8>,
    pub written_at: Instant,
    pub ttl_class: TtlClass,
}

pub struct MemoryCache {
    policy: TtlPolicy,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new(policy: TtlPolicy) -> Self {
        Self {
            policy,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.written_at) < self.policy.ttl(entry.ttl_class)
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        self.sweep(&mut entries, Instant::now())
    }

    fn sweep(&self, entries: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, e| self.is_fresh(e, now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(key)?;
            if self.is_fresh(entry, Instant::now()) {
                return Some(entry.payload.clone());
            }
        }

        // Expired: evict unless a writer refreshed it in between
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|e| !self.is_fresh(e, Instant::now()))
        {
            entries.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: TtlClass) {
        let entry = CacheEntry {
            payload: value,
            written_at: Instant::now(),
            ttl_class: ttl,
        };
        let mut entries = self.entries.write().await;
        let evicted = self.sweep(&mut entries, entry.written_at);
        if evicted > 0 {
            debug!(evicted, "expired cache entries evicted");
        }
        entries.insert(key.to_string(), entry);
    }
}

/// Collapse whitespace and case so trivially different spellings share a key.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `blake3(normalized text ‖ stage)` as hex.
pub fn cache_key(stage: &str, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(normalize_text(text).as_bytes());
    hasher.update(&[0]);
    hasher.update(stage.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Typed read. A payload that no longer deserializes counts as a miss.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn CacheStore, key: &str) -> Option<T> {
    let bytes = cache.get(key).await?;
    let short = key.get(..12).unwrap_or(key);
    match serde_json::from_slice(&bytes) {
        Ok(value) => {
            debug!(key = short, "cache hit");
            Some(value)
        }
        Err(e) => {
            warn!(key = short, error = %e, "discarding undecodable cache entry");
            None
        }
    }
}

pub async fn put_json<T: Serialize>(cache: &dyn CacheStore, key: &str, value: &T, ttl: TtlClass) {
    match serde_json::to_vec(value) {
        Ok(bytes) => cache.set(key, bytes, ttl).await,
        Err(e) => warn!(error = %e, "failed to serialize cache payload"),
    }
}
