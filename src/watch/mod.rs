// src/watch/mod.rs
//! Feed fetching: retrieve a source URL and normalize it into update
//! records, whatever shape the source takes (Atom, RSS, or bare HTML).

pub mod feed;
pub mod html;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::knowledge::UpdateRecord;
use crate::retry::{retry, RetryPolicy};

/// Extracted bodies are capped at this many chars, with a `...` marker
/// appended when the cap is hit.
pub const SUMMARY_CAP: usize = 500;

/// Seam the aggregator consumes; lets tests substitute failing sources.
#[async_trait]
pub trait UpdateFetcher: Send + Sync {
    async fn try_fetch_recent(&self, url: &str, max_items: usize) -> Result<Vec<UpdateRecord>>;
}

pub struct Fetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; field-pulse/0.1)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(12))
            .build()
            .expect("reqwest client");
        Self {
            client,
            policy: RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(10)),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch and extract the most recent updates from a source.
    ///
    /// Never raises to the caller: unrecoverable failure (network exhausted
    /// after retries, nothing extractable) returns an empty sequence. Only
    /// the network I/O is retried; parse failures are not transient and
    /// fall through to the HTML heuristic or an empty result.
    pub async fn fetch_recent(&self, url: &str, max_items: usize) -> Vec<UpdateRecord> {
        match self.try_fetch_recent(url, max_items).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, url, "fetch failed after retries");
                Vec::new()
            }
        }
    }

    /// Lightweight "latest" probe.
    pub async fn fetch_latest(&self, url: &str) -> Option<UpdateRecord> {
        self.fetch_recent(url, 1).await.into_iter().next()
    }

    /// Extraction without the network: dispatch a fetched body by URL shape.
    /// Public so fixture-driven tests parse exactly what production parses.
    pub fn extract(&self, url: &str, body: &str, max_items: usize) -> Vec<UpdateRecord> {
        let t0 = std::time::Instant::now();

        let records = if has_feed_extension(url) {
            match feed::parse_feed(body, max_items) {
                Ok(items) if !items.is_empty() => items,
                Ok(_) => {
                    tracing::info!(url, "feed parsed but empty, trying html heuristic");
                    html::parse_release_page(body, url, max_items)
                }
                Err(e) => {
                    tracing::warn!(error = ?e, url, "feed parse failed, trying html heuristic");
                    html::parse_release_page(body, url, max_items)
                }
            }
        } else {
            html::parse_release_page(body, url, max_items)
        };

        histogram!("pulse_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("pulse_records_extracted_total").increment(records.len() as u64);
        records
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdateFetcher for Fetcher {
    async fn try_fetch_recent(&self, url: &str, max_items: usize) -> Result<Vec<UpdateRecord>> {
        let body = retry(self.policy, || async {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .context("feed http get")?;
            let resp = resp.error_for_status().context("feed http status")?;
            resp.text().await.context("feed http body")
        })
        .await?;

        Ok(self.extract(url, &body, max_items))
    }
}

/// Does the URL's path extension indicate a machine-readable feed?
pub fn has_feed_extension(url: &str) -> bool {
    static RE_EXT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\.(xml|atom|rss)(?:[?#]|$)").unwrap());
    RE_EXT.is_match(url)
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());

/// Strip embedded markup tags and decode entities.
pub(crate) fn strip_tags(s: &str) -> String {
    let no_tags = RE_TAGS.replace_all(s, "");
    html_escape::decode_html_entities(&no_tags).trim().to_string()
}

/// Cap to `cap` chars, appending a truncation marker when the cap is hit.
pub(crate) fn clip_text(s: &str, cap: usize) -> String {
    let mut out: String = s.chars().take(cap).collect();
    if s.chars().count() > cap {
        out.push_str("...");
    }
    out
}
