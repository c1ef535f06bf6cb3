//! HTTP search collaborators.
//!
//! Responses are read as `serde_json::Value` and mapped field by field; a
//! row missing its URL or title is dropped, the rest of the response is kept.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::evidence::normalize::host_of;
use crate::traits::{FactClaimHit, FactClaimProvider, SearchHit, SearchProvider};
use crate::types::{EvidenceSource, QueryTarget};

const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const NEWSDATA_URL: &str = "https://newsdata.io/api/1/news";
const FACT_CHECK_URL: &str = "https://factchecktools.googleapis.com/v1alpha1/claims:search";

/// Upper bound on the HTTP client itself; callers apply their own, usually
/// shorter, per-call timeout on top.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

fn env_key(name: &str) -> Option<String> {
    dotenv::var(name).ok().filter(|k| !k.trim().is_empty())
}

async fn get_json(req: reqwest::RequestBuilder, provider: &str) -> Result<Value> {
    let resp = req
        .send()
        .await
        .with_context(|| format!("{} request failed", provider))?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("{} returned HTTP {}", provider, status);
    }
    let text = resp
        .text()
        .await
        .with_context(|| format!("Failed to read {} response", provider))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {} JSON", provider))
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value[key].as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn publisher_for(url: &str, reported: Option<&str>) -> String {
    reported
        .map(str::to_string)
        .or_else(|| host_of(url))
        .unwrap_or_else(|| "unknown".to_string())
}

pub struct GoogleCustomSearch {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
}

impl GoogleCustomSearch {
    pub fn new(api_key: String, engine_id: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
            engine_id,
        })
    }

    /// `None` unless both `SEARCH_API_KEY` and `SEARCH_ENGINE_ID` are set.
    pub fn from_env() -> Result<Option<Self>> {
        match (env_key("SEARCH_API_KEY"), env_key("SEARCH_ENGINE_ID")) {
            (Some(key), Some(cx)) => Self::new(key, cx).map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleCustomSearch {
    fn name(&self) -> &str {
        "google-search"
    }

    fn kind(&self) -> EvidenceSource {
        EvidenceSource::SearchResult
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let num = max_results.clamp(1, 10).to_string();
        let req = self.client.get(GOOGLE_SEARCH_URL).query(&[
            ("key", self.api_key.as_str()),
            ("cx", self.engine_id.as_str()),
            ("q", query),
            ("num", num.as_str()),
        ]);
        let json = get_json(req, self.name()).await?;
        let hits = parse_google_search(&json);
        debug!(provider = self.name(), hits = hits.len(), "search complete");
        Ok(hits)
    }
}

pub fn parse_google_search(json: &Value) -> Vec<SearchHit> {
    let Some(items) = json["items"].as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let url = str_field(item, "link")?;
            let title = str_field(item, "title")?;
            let published_at = item["pagemap"]["metatags"]
                .get(0)
                .and_then(|m| str_field(m, "article:published_time"))
                .map(str::to_string);
            Some(SearchHit {
                title: title.to_string(),
                url: url.to_string(),
                snippet: str_field(item, "snippet").unwrap_or_default().to_string(),
                published_at,
                source: publisher_for(url, str_field(item, "displayLink")),
            })
        })
        .collect()
}

pub struct SerpApiSearch {
    client: reqwest::Client,
    api_key: String,
}

impl SerpApiSearch {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
        })
    }

    pub fn from_env() -> Result<Option<Self>> {
        env_key("SERP_API_KEY").map(Self::new).transpose()
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    fn name(&self) -> &str {
        "serpapi"
    }

    fn kind(&self) -> EvidenceSource {
        EvidenceSource::SearchResult
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let num = max_results.max(1).to_string();
        let req = self.client.get(SERPAPI_URL).query(&[
            ("engine", "google"),
            ("q", query),
            ("num", num.as_str()),
            ("api_key", self.api_key.as_str()),
        ]);
        let json = get_json(req, self.name()).await?;
        let mut hits = parse_serpapi(&json);
        hits.truncate(max_results);
        debug!(provider = self.name(), hits = hits.len(), "search complete");
        Ok(hits)
    }
}

pub fn parse_serpapi(json: &Value) -> Vec<SearchHit> {
    let Some(results) = json["organic_results"].as_array() else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(|r| {
            let url = str_field(r, "link")?;
            let title = str_field(r, "title")?;
            Some(SearchHit {
                title: title.to_string(),
                url: url.to_string(),
                snippet: str_field(r, "snippet").unwrap_or_default().to_string(),
                published_at: str_field(r, "date").map(str::to_string),
                source: publisher_for(url, str_field(r, "source")),
            })
        })
        .collect()
}

pub struct NewsDataSearch {
    client: reqwest::Client,
    api_key: String,
}

impl NewsDataSearch {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
        })
    }

    pub fn from_env() -> Result<Option<Self>> {
        env_key("NEWSDATA_API_KEY").map(Self::new).transpose()
    }
}

#[async_trait]
impl SearchProvider for NewsDataSearch {
    fn name(&self) -> &str {
        "newsdata"
    }

    fn kind(&self) -> EvidenceSource {
        EvidenceSource::News
    }

    fn accepts(&self, target: QueryTarget) -> bool {
        target == QueryTarget::News
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let req = self.client.get(NEWSDATA_URL).query(&[
            ("apikey", self.api_key.as_str()),
            ("q", query),
            ("language", "en"),
        ]);
        let json = get_json(req, self.name()).await?;
        let mut hits = parse_newsdata(&json);
        hits.truncate(max_results);
        debug!(provider = self.name(), hits = hits.len(), "search complete");
        Ok(hits)
    }
}

pub fn parse_newsdata(json: &Value) -> Vec<SearchHit> {
    let Some(results) = json["results"].as_array() else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(|r| {
            let url = str_field(r, "link")?;
            let title = str_field(r, "title")?;
            let reported = str_field(r, "source_name").or_else(|| str_field(r, "source_id"));
            Some(SearchHit {
                title: title.to_string(),
                url: url.to_string(),
                snippet: str_field(r, "description").unwrap_or_default().to_string(),
                published_at: str_field(r, "pubDate").map(str::to_string),
                source: publisher_for(url, reported),
            })
        })
        .collect()
}

pub struct GoogleFactCheck {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleFactCheck {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
        })
    }

    pub fn from_env() -> Result<Option<Self>> {
        env_key("FACT_CHECK_API_KEY").map(Self::new).transpose()
    }
}

#[async_trait]
impl FactClaimProvider for GoogleFactCheck {
    fn name(&self) -> &str {
        "google-factcheck"
    }

    async fn search_claims(&self, query: &str, max_results: usize) -> Result<Vec<FactClaimHit>> {
        let page_size = max_results.max(1).to_string();
        let req = self.client.get(FACT_CHECK_URL).query(&[
            ("query", query),
            ("pageSize", page_size.as_str()),
            ("languageCode", "en"),
            ("key", self.api_key.as_str()),
        ]);
        let json = get_json(req, self.name()).await?;
        let mut hits = parse_fact_check(&json);
        hits.truncate(max_results);
        debug!(provider = self.name(), hits = hits.len(), "claim search complete");
        Ok(hits)
    }
}

/// Maps `claims[].claimReview[0]`; claims without a review URL are dropped.
pub fn parse_fact_check(json: &Value) -> Vec<FactClaimHit> {
    let Some(claims) = json["claims"].as_array() else {
        return Vec::new();
    };
    claims
        .iter()
        .filter_map(|claim| {
            let review = claim["claimReview"].get(0)?;
            let url = str_field(review, "url")?;
            let reviewer = str_field(&review["publisher"], "name")
                .or_else(|| str_field(&review["publisher"], "site"))
                .map(str::to_string)
                .or_else(|| host_of(url))
                .unwrap_or_else(|| "unknown".to_string());
            Some(FactClaimHit {
                claim_text: str_field(claim, "text").unwrap_or_default().to_string(),
                rating: str_field(review, "textualRating").unwrap_or("Unrated").to_string(),
                reviewer,
                url: url.to_string(),
                review_date: str_field(review, "reviewDate")
                    .or_else(|| str_field(claim, "claimDate"))
                    .map(str::to_string),
            })
        })
        .collect()
}
