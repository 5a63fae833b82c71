// src/enrich/mod.rs
//! Multi-stage enrichment: per-item guard/backfill/bridge/tags/refine,
//! then a cross-item executive synthesis.
//!
//! Failure semantics: every external call is individually guarded; one
//! call's failure never aborts other items or other fields of the same
//! item. The worst case for any item is the rule-based bridge with empty
//! tags and an untouched summary.

pub mod rules;

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use metrics::counter;
use sha2::{Digest, Sha256};

use crate::ai::DynCompletion;
use crate::knowledge::UpdateRecord;
use crate::report::SynthesizedReport;
use crate::retry::{retry, RetryPolicy};
use crate::scrub::scrub_pii;

/// Summaries shorter than this are considered missing and backfilled.
const MIN_SUMMARY_LEN: usize = 40;
/// Summaries longer than this are refined into business-audience form.
const REFINE_THRESHOLD: usize = 300;
/// How much raw summary context a bridge prompt may carry.
const BRIDGE_CONTEXT_CAP: usize = 1000;
/// How many items feed the executive synthesis.
const TLDR_TOP_N: usize = 10;

pub const NO_UPDATES_TLDR: &str = "No new updates found for this period.";
pub const GENERIC_TLDR: &str =
    "Review the technical roadmap updates below for recent shifts in the AI platform and agent ecosystem.";

/// One pipeline invocation. Owns the summary cache; a cache is never
/// shared across concurrent independent invocations.
pub struct Pipeline {
    client: Option<DynCompletion>,
    policy: RetryPolicy,
    cache: Mutex<HashMap<String, String>>,
}

impl Pipeline {
    pub fn new(client: Option<DynCompletion>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enrich every record in place and synthesize the executive TLDR.
    pub async fn enrich(&self, mut records: Vec<UpdateRecord>) -> SynthesizedReport {
        if records.is_empty() {
            return SynthesizedReport {
                items: Vec::new(),
                tldr: NO_UPDATES_TLDR.to_string(),
            };
        }

        tracing::info!(count = records.len(), "synthesizing field reports");
        for rec in &mut records {
            self.enrich_item(rec).await;
        }

        let tldr = self.executive_tldr(&records).await;
        SynthesizedReport {
            items: records,
            tldr,
        }
    }

    async fn enrich_item(&self, rec: &mut UpdateRecord) {
        if !rules::passes_injection_guard(&rec.summary) {
            tracing::warn!(title = %rec.title, source = %rec.source, "injection phrase detected, blocking item");
            counter!("pulse_enrich_blocked_total").increment(1);
            rec.bridge = Some(rules::BLOCKED_BRIDGE.to_string());
            rec.tags = vec![rules::SECURITY_TAG.to_string()];
            return;
        }

        self.backfill_summary(rec).await;
        rec.bridge = Some(self.bridge_for(rec).await);
        rec.tags = self.tags_for(rec).await;
        self.refine_summary(rec).await;
    }

    /// Retried completion call; `Err` when no client is configured or the
    /// retries are exhausted.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .context("no completion service configured")?;
        retry(self.policy, || async { client.generate(prompt).await }).await
    }

    async fn backfill_summary(&self, rec: &mut UpdateRecord) {
        if rec.summary.trim().chars().count() >= MIN_SUMMARY_LEN || self.client.is_none() {
            return;
        }
        let prompt = format!(
            "Write a short technical summary (2 sentences) of this AI platform update.\n\
             Title: {}\nSource: {}\nReturn only the summary.",
            rec.title, rec.description
        );
        match self.generate(&prompt).await {
            Ok(text) => rec.summary = text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = ?e, title = %rec.title, "summary backfill failed, keeping original");
            }
        }
    }

    /// Cache -> retried completion call -> rule-based fallback. The bridge
    /// is PII-scrubbed before storage on every path; the cache is written
    /// only after the retried call has succeeded.
    async fn bridge_for(&self, rec: &UpdateRecord) -> String {
        if self.client.is_none() {
            return scrub_pii(&rules::bridge_roadmap_to_field(rec));
        }

        let key = cache_key(&rec.title, &rec.date);
        if let Some(hit) = self.cache.lock().expect("cache poisoned").get(&key) {
            return hit.clone();
        }

        let context: String = rec.summary.chars().take(BRIDGE_CONTEXT_CAP).collect();
        let prompt = format!(
            "You are a technical consultant for an AI cloud platform.\n\
             Translate the following technical update into a 'Field Talk Track' for sales and architects.\n\n\
             Update Title: {}\nSource: {}\nRaw Content: {}\n\n\
             Format: One concise, high-impact sentence explaining WHY this matters for customers and what the sales play is.",
            rec.title, rec.description, context
        );

        match self.generate(&prompt).await {
            Ok(text) => {
                let bridge = scrub_pii(text.trim());
                self.cache
                    .lock()
                    .expect("cache poisoned")
                    .insert(key, bridge.clone());
                bridge
            }
            Err(e) => {
                tracing::warn!(error = ?e, title = %rec.title, "bridge generation failed, using rule classifier");
                counter!("pulse_bridge_fallback_total").increment(1);
                scrub_pii(&rules::bridge_roadmap_to_field(rec))
            }
        }
    }

    /// Comma-separated keywords from the completion service; empty on any
    /// failure. There is no rule fallback for tags, only for the bridge.
    async fn tags_for(&self, rec: &UpdateRecord) -> Vec<String> {
        if self.client.is_none() {
            return Vec::new();
        }
        let prompt = format!(
            "Categorize this technical update with 1-2 keywords \
             (e.g. Governance, Security, UX, Performance, Scalability). \
             Update: {}. Return only keywords separated by commas.",
            rec.title
        );
        match self.generate(&prompt).await {
            Ok(text) => text
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                tracing::warn!(error = ?e, title = %rec.title, "tag generation failed");
                Vec::new()
            }
        }
    }

    async fn refine_summary(&self, rec: &mut UpdateRecord) {
        if rec.summary.chars().count() <= REFINE_THRESHOLD || self.client.is_none() {
            return;
        }
        let prompt = format!(
            "Summarize this for a business audience as 2-3 short bullet points, focus on impact: {}",
            rec.summary
        );
        match self.generate(&prompt).await {
            Ok(text) => rec.summary = text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = ?e, title = %rec.title, "summary refinement failed, keeping original");
            }
        }
    }

    /// Executive synthesis over the first N enriched items. Reads items,
    /// never mutates them.
    async fn executive_tldr(&self, records: &[UpdateRecord]) -> String {
        if self.client.is_none() {
            return GENERIC_TLDR.to_string();
        }
        let titles: Vec<String> = records
            .iter()
            .take(TLDR_TOP_N)
            .map(|r| format!("- {} ({})", r.title, r.source))
            .collect();
        let prompt = format!(
            "You are a lead technical program consultant.\n\
             Provide a high-level 'Executive TLDR' (2-3 sentences) summarizing the theme of these recent AI updates:\n{}\n\n\
             Focus on the collective impact for the field team and customers.",
            titles.join("\n")
        );
        match self.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = ?e, "executive synthesis failed, using generic TLDR");
                GENERIC_TLDR.to_string()
            }
        }
    }
}

/// Cache key for one logical item within a run: digest of title + date.
fn cache_key(title: &str, date: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"\n");
    hasher.update(date.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_separates_title_and_date() {
        // "a" + "bc" must not collide with "ab" + "c".
        assert_ne!(cache_key("a", "bc"), cache_key("ab", "c"));
        assert_eq!(cache_key("t", "d"), cache_key("t", "d"));
    }
}
