//! Long-term report storage on cnidarium.
//!
//! Layout:
//! - `report/body/{id}` holds the JSON report.
//! - `report/index/{created_at:020}:{id}` holds a [`ReportSummary`] for history listings.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::traits::ReportPersistence;
use crate::types::{FactCheckReport, Verdict};

const BODY_PREFIX: &str = "report/body";
const INDEX_PREFIX: &str = "report/index";

const EXCERPT_CHARS: usize = 80;

fn body_key(id: &str) -> String {
    format!("{}/{}", BODY_PREFIX, id)
}
fn index_key(created_at: i64, id: &str) -> String {
    format!("{}/{:020}:{}", INDEX_PREFIX, created_at.max(0), id)
}

/// One history row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: String,
    pub verdict: Option<Verdict>,
    pub final_score: Option<u8>,
    pub created_at: i64,
    pub excerpt: String,
}

impl ReportSummary {
    fn from_report(report: &FactCheckReport) -> Self {
        let mut excerpt: String = report.original_text.chars().take(EXCERPT_CHARS).collect();
        if report.original_text.chars().count() > EXCERPT_CHARS {
            excerpt.push('…');
        }
        Self {
            id: report.id.clone(),
            verdict: Some(report.verdict),
            final_score: Some(report.final_score),
            created_at: report.metadata.created_at,
            excerpt,
        }
    }
}

pub struct ReportStore {
    storage: Storage,
    /// Commits must fork from the latest snapshot, so writers take turns.
    write_lock: Mutex<()>,
}

impl ReportStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let prefixes = vec![BODY_PREFIX.to_string(), INDEX_PREFIX.to_string()];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self {
            storage,
            write_lock: Mutex::new(()),
        })
    }

    pub async fn save(&self, report: &FactCheckReport) -> Result<String> {
        let payload = serde_json::to_vec(report).context("serialize report")?;
        self.write(&report.id, payload, ReportSummary::from_report(report)).await
    }

    async fn write(&self, id: &str, payload: Vec<u8>, summary: ReportSummary) -> Result<String> {
        let _guard = self.write_lock.lock().await;

        let snapshot = self.storage.latest_snapshot();
        let already_indexed = snapshot.get_raw(&body_key(id)).await?.is_some();

        let mut delta = StateDelta::new(snapshot);
        let key = body_key(id);
        let size = payload.len();
        delta.put_raw(key.clone(), payload);
        if !already_indexed {
            delta.put_raw(
                index_key(summary.created_at, id),
                serde_json::to_vec(&summary).context("serialize summary")?,
            );
        }

        self.storage.commit(delta).await?;
        debug!(report_id = %id, size, "report stored");
        Ok(key)
    }

    pub async fn load(&self, id: &str) -> Result<Option<FactCheckReport>> {
        let snapshot = self.storage.latest_snapshot();
        let Some(bytes) = snapshot.get_raw(&body_key(id)).await? else {
            return Ok(None);
        };
        let report = serde_json::from_slice(&bytes).with_context(|| format!("decode report {}", id))?;
        Ok(Some(report))
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<ReportSummary>> {
        let snapshot = self.storage.latest_snapshot();
        let mut stream = snapshot.prefix_raw(INDEX_PREFIX);
        let mut results = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((_key, value)) => match serde_json::from_slice::<ReportSummary>(&value) {
                    Ok(summary) => results.push(summary),
                    Err(e) => warn!(error = %e, "skipping undecodable history entry"),
                },
                Err(e) => warn!(error = %e, "error reading report index stream"),
            }
        }

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        results.truncate(limit);
        Ok(results)
    }
}

#[async_trait]
impl ReportPersistence for ReportStore {
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<String> {
        let summary = match serde_json::from_slice::<FactCheckReport>(&payload) {
            Ok(report) => ReportSummary::from_report(&report),
            Err(_) => ReportSummary {
                id: key.to_string(),
                verdict: None,
                final_score: None,
                created_at: chrono::Utc::now().timestamp_millis(),
                excerpt: String::new(),
            },
        };
        self.write(key, payload, summary).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.storage.latest_snapshot().get_raw(&body_key(key)).await?)
    }
}

/// Persist `report` on a detached task. Failures are logged, never returned.
pub fn spawn_persist(store: Arc<dyn ReportPersistence>, report: &FactCheckReport) -> JoinHandle<()> {
    let id = report.id.clone();
    let payload = serde_json::to_vec(report);
    tokio::spawn(async move {
        let payload = match payload {
            Ok(p) => p,
            Err(e) => {
                warn!(report_id = %id, error = %e, "failed to serialize report for persistence");
                return;
            }
        };
        match store.put(&id, payload).await {
            Ok(locator) => debug!(report_id = %id, locator = %locator, "report persisted"),
            Err(e) => warn!(report_id = %id, error = %e, "report persistence failed"),
        }
    })
}
