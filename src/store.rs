// src/store.rs
//! Vector/RAG store boundary. The store is available-or-disabled; when
//! disabled, persistence is skipped with a notice instead of failing.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::knowledge::UpdateRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseHit {
    pub id: String,
    pub document: String,
    pub source: String,
}

#[async_trait]
pub trait PulseStore: Send + Sync {
    async fn upsert(&self, records: &[UpdateRecord]) -> Result<()>;
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<PulseHit>>;
}

/// Stable identifier for one logical pulse document.
pub fn pulse_id(rec: &UpdateRecord) -> String {
    let raw = format!("{}_{}_{}", rec.source, rec.title, rec.date);
    raw.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Flat-text rendering stored as the document body.
pub fn render_document(rec: &UpdateRecord) -> String {
    format!(
        "Title: {}\nSource: {}\nCategory: {}\nDate: {}\nTags: {}\nURL: {}\n\nSummary: {}\n\nBridge: {}\n",
        rec.title,
        rec.source,
        rec.category,
        rec.date,
        rec.tags.join(", "),
        rec.source_url,
        rec.summary,
        rec.bridge.as_deref().unwrap_or_default(),
    )
}

/// Used when no store is configured. Emits a notice and stays empty.
pub struct DisabledStore;

#[async_trait]
impl PulseStore for DisabledStore {
    async fn upsert(&self, records: &[UpdateRecord]) -> Result<()> {
        tracing::info!(
            count = records.len(),
            "vector store disabled; skipping persistence"
        );
        Ok(())
    }

    async fn query(&self, _text: &str, _top_k: usize) -> Result<Vec<PulseHit>> {
        tracing::info!("vector store disabled; query returns nothing");
        Ok(Vec::new())
    }
}

/// Process-local store backing tests and single-machine runs. Retrieval is
/// naive term matching, which is enough for an opaque upsert/query seam.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<PulseHit>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PulseStore for MemoryStore {
    async fn upsert(&self, records: &[UpdateRecord]) -> Result<()> {
        let mut docs = self.docs.lock().expect("store poisoned");
        for rec in records {
            let id = pulse_id(rec);
            let hit = PulseHit {
                id: id.clone(),
                document: render_document(rec),
                source: rec.source.clone(),
            };
            if let Some(existing) = docs.iter_mut().find(|d| d.id == id) {
                *existing = hit;
            } else {
                docs.push(hit);
            }
        }
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<PulseHit>> {
        let needle = text.to_lowercase();
        let terms: Vec<&str> = needle.split_whitespace().collect();
        let docs = self.docs.lock().expect("store poisoned");

        let mut scored: Vec<(usize, PulseHit)> = docs
            .iter()
            .map(|d| {
                let hay = d.document.to_lowercase();
                let score = terms.iter().filter(|t| hay.contains(*t)).count();
                (score, d.clone())
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored.into_iter().take(top_k).map(|(_, d)| d).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str, source: &str) -> UpdateRecord {
        let mut r = UpdateRecord::from_feed(
            Some(title.to_string()),
            Some("2026-02-06".to_string()),
            "Longer context windows for everyone.".to_string(),
            String::new(),
            None,
        );
        r.source = source.to_string();
        r
    }

    #[test]
    fn pulse_id_is_filename_safe() {
        let id = pulse_id(&rec("Gemini 2.0: bigger & better!", "gemini-docs"));
        assert!(id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-')));
    }

    #[tokio::test]
    async fn memory_store_upserts_and_queries() {
        let store = MemoryStore::new();
        store
            .upsert(&[rec("Gemini context update", "gemini-docs")])
            .await
            .unwrap();
        // same logical item twice does not duplicate
        store
            .upsert(&[rec("Gemini context update", "gemini-docs")])
            .await
            .unwrap();

        let hits = store.query("gemini context", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "gemini-docs");

        let none = store.query("unrelated kubernetes", 5).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn disabled_store_is_a_quiet_no_op() {
        let store = DisabledStore;
        store.upsert(&[rec("x", "y")]).await.unwrap();
        assert!(store.query("x", 5).await.unwrap().is_empty());
    }
}
