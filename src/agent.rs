// src/agent.rs
//! The pulse agent: one instance per batch run, wiring the fetcher,
//! watchlist, enrichment pipeline, and optional store together.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use crate::ai::{build_completion_client, load_ai_config};
use crate::enrich::Pipeline;
use crate::knowledge::{self, cutoff_start_of_day, recent_only, UpdateRecord};
use crate::report::{self, SynthesizedReport};
use crate::sink::OutputSink;
use crate::store::{PulseHit, PulseStore};
use crate::watch::{Fetcher, UpdateFetcher};
use crate::watchlist::{load_watchlist_default, Watchlist};

const DEFAULT_ITEMS_PER_SOURCE: usize = 10;

pub struct PulseAgent {
    fetcher: Box<dyn UpdateFetcher>,
    watchlist: Watchlist,
    pipeline: Pipeline,
    store: Option<Arc<dyn PulseStore>>,
    items_per_source: usize,
}

impl PulseAgent {
    /// Production wiring: config from disk/env, soft-disabled capabilities
    /// degrade with a warning instead of failing the run.
    pub fn from_env() -> Self {
        let watchlist = load_watchlist_default().unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "watchlist load failed; starting with empty watchlist");
            Watchlist::new()
        });
        let ai_cfg = load_ai_config();
        let client = build_completion_client(&ai_cfg);
        if client.is_none() {
            tracing::info!("completion service not configured; rule-based enrichment only");
        }
        Self::new(Box::new(Fetcher::new()), watchlist, Pipeline::new(client))
    }

    pub fn new(fetcher: Box<dyn UpdateFetcher>, watchlist: Watchlist, pipeline: Pipeline) -> Self {
        Self {
            fetcher,
            watchlist,
            pipeline,
            store: None,
            items_per_source: DEFAULT_ITEMS_PER_SOURCE,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn PulseStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_items_per_source(mut self, n: usize) -> Self {
        self.items_per_source = n;
        self
    }

    /// Raw aggregation across the watchlist, unfiltered.
    pub async fn browse(&self) -> Vec<UpdateRecord> {
        knowledge::browse(self.fetcher.as_ref(), &self.watchlist, self.items_per_source).await
    }

    /// Enrich an already-aggregated (and typically filtered) sequence.
    pub async fn synthesize(&self, records: Vec<UpdateRecord>) -> SynthesizedReport {
        self.pipeline.enrich(records).await
    }

    /// One full batch run: browse, filter to the lookback window,
    /// synthesize, and persist when a store is configured.
    pub async fn pulse(&self, days: i64) -> SynthesizedReport {
        let all = self.browse().await;
        let cutoff = cutoff_start_of_day(Utc::now(), days);
        let recent = recent_only(all, cutoff);
        let synthesized = self.synthesize(recent).await;

        match &self.store {
            Some(store) => {
                if let Err(e) = store.upsert(&synthesized.items).await {
                    tracing::warn!(error = ?e, "pulse persistence failed; report still delivered");
                }
            }
            None => tracing::info!("no pulse store configured; skipping persistence"),
        }

        synthesized
    }

    /// Semantic retrieval over previously persisted pulses.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<PulseHit>> {
        match &self.store {
            Some(store) => store.query(text, top_k).await,
            None => {
                tracing::info!("no pulse store configured; query returns nothing");
                Ok(Vec::new())
            }
        }
    }

    /// Render the report through the injected sink.
    pub fn promote(&self, synthesized: &SynthesizedReport, days: i64, sink: &dyn OutputSink) {
        report::render(synthesized, days, sink);
    }
}
