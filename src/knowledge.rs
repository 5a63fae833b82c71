// src/knowledge.rs
//! The canonical update record and the per-source aggregator.

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::normalize;
use crate::watch::UpdateFetcher;
use crate::watchlist::Watchlist;

pub const UNTITLED: &str = "Untitled Update";
pub const NO_DATE: &str = "N/A";
pub const NO_VERSION: &str = "N/A";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pulse_records_total", "Records produced by source fetches.");
        describe_counter!(
            "pulse_source_errors_total",
            "Per-source fetch failures absorbed by the aggregator."
        );
        describe_counter!(
            "pulse_enrich_blocked_total",
            "Items short-circuited by the injection guard."
        );
        describe_counter!(
            "pulse_bridge_fallback_total",
            "Bridges that fell back to the rule-based classifier."
        );
        describe_gauge!("pulse_last_browse_ts", "Unix ts when browse last ran.");
    });
}

/// The canonical unit of knowledge, created by the fetcher, annotated by
/// the aggregator, mutated in place by the enrichment pipeline and
/// read-only afterwards.
///
/// `date` keeps the raw source string; the canonical timestamp is derived
/// on demand so re-parsing stays idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateRecord {
    pub title: String,
    pub date: String,
    pub summary: String,
    pub source_url: String,
    pub version: String,
    pub source: String,
    pub category: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_score: Option<u8>,
}

impl UpdateRecord {
    /// Canonicalize raw feed fields once, at construction. Missing title
    /// and date degrade to sentinels instead of failing the entry.
    pub fn from_feed(
        title: Option<String>,
        date: Option<String>,
        summary: String,
        source_url: String,
        version: Option<String>,
    ) -> Self {
        Self {
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            date: date
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| NO_DATE.to_string()),
            summary,
            source_url,
            version: version.unwrap_or_else(|| NO_VERSION.to_string()),
            source: String::new(),
            category: "general".to_string(),
            description: String::new(),
            bridge: None,
            tags: Vec::new(),
            impact_score: None,
        }
    }

    /// Timezone-aware timestamp derived from the raw `date` string.
    /// Unparseable dates are "very old" by construction.
    pub fn canonical_date(&self) -> DateTime<Utc> {
        normalize::canonical_date(&self.date)
    }
}

/// Fetch every watchlist source and flatten the results into one annotated
/// sequence. A single source's failure never aborts the aggregation: it is
/// logged, counted, and contributes nothing.
///
/// Per-source item order is preserved; no global sort happens here. The
/// final date sort belongs to report assembly, which knows the direction.
pub async fn browse(
    fetcher: &dyn UpdateFetcher,
    watchlist: &Watchlist,
    max_items_per_source: usize,
) -> Vec<UpdateRecord> {
    ensure_metrics_described();

    let mut knowledge = Vec::new();
    for (name, info) in watchlist {
        let records = match fetcher.try_fetch_recent(&info.feed, max_items_per_source).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, source = %name, "source fetch failed, skipping");
                counter!("pulse_source_errors_total").increment(1);
                Vec::new()
            }
        };
        counter!("pulse_records_total").increment(records.len() as u64);
        for mut rec in records {
            rec.source = name.clone();
            rec.category = info.category.clone();
            rec.description = info.description.clone();
            knowledge.push(rec);
        }
    }

    gauge!("pulse_last_browse_ts").set(Utc::now().timestamp().max(0) as f64);
    knowledge
}

/// Cutoff for an N-day lookback: now minus `days`, truncated to the start
/// of that calendar day in UTC.
pub fn cutoff_start_of_day(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    (now - Duration::days(days))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

/// Pure recency filter. Records with unparseable dates normalize to the
/// year-old sentinel and are excluded by construction.
pub fn recent_only(records: Vec<UpdateRecord>, cutoff: DateTime<Utc>) -> Vec<UpdateRecord> {
    records
        .into_iter()
        .filter(|r| r.canonical_date() >= cutoff)
        .collect()
}

/// Newest first. Applied once by report assembly, not by the aggregator.
/// The key is cached per record: the unparseable-date sentinel embeds
/// "now", so deriving it once keeps the comparator consistent mid-sort.
pub fn sort_by_date_desc(records: &mut [UpdateRecord]) {
    records.sort_by_cached_key(|r| std::cmp::Reverse(r.canonical_date()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(date: &str) -> UpdateRecord {
        UpdateRecord::from_feed(
            Some("t".into()),
            Some(date.to_string()),
            String::new(),
            String::new(),
            None,
        )
    }

    #[test]
    fn cutoff_truncates_to_midnight_utc() {
        let now = Utc.with_ymd_and_hms(2026, 2, 8, 15, 30, 0).unwrap();
        let cutoff = cutoff_start_of_day(now, 2);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 2, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn recency_filter_drops_old_and_unparseable() {
        let now = Utc.with_ymd_and_hms(2026, 2, 8, 12, 0, 0).unwrap();
        let cutoff = cutoff_start_of_day(now, 1);
        let records = vec![
            rec("2026-02-08T09:00:00Z"),
            rec("2026-02-07T00:00:00Z"),
            rec("2026-01-01T00:00:00Z"),
            rec("not a date"),
        ];
        let kept = recent_only(records, cutoff);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn sort_is_descending_by_canonical_date() {
        let mut records = vec![
            rec("2026-02-05T00:00:00Z"),
            rec("garbage"),
            rec("2026-02-07T00:00:00Z"),
        ];
        sort_by_date_desc(&mut records);
        assert_eq!(records[0].date, "2026-02-07T00:00:00Z");
        assert_eq!(records[1].date, "2026-02-05T00:00:00Z");
        assert_eq!(records[2].date, "garbage");
    }

    #[test]
    fn sort_keeps_sentinel_dates_behind_parseable_ones() {
        // Several unparseable dates at once: each sentinel is derived
        // exactly once, all of them sort after every dated record, and
        // nothing is lost or duplicated.
        let mut records = vec![
            rec("junk-a"),
            rec("2026-02-05T00:00:00Z"),
            rec("junk-b"),
            rec("2026-02-07T00:00:00Z"),
            rec("junk-c"),
        ];
        sort_by_date_desc(&mut records);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].date, "2026-02-07T00:00:00Z");
        assert_eq!(records[1].date, "2026-02-05T00:00:00Z");
        assert!(records[2..].iter().all(|r| r.date.starts_with("junk-")));
    }

    #[test]
    fn construction_applies_sentinels_once() {
        let r = UpdateRecord::from_feed(None, Some("  ".into()), String::new(), String::new(), None);
        assert_eq!(r.title, UNTITLED);
        assert_eq!(r.date, NO_DATE);
        assert_eq!(r.version, NO_VERSION);
        assert_eq!(r.category, "general");
    }
}
