// src/report.rs
//! Report assembly: the immutable output aggregate and its rendering.

use serde::{Deserialize, Serialize};

use crate::knowledge::{sort_by_date_desc, UpdateRecord};
use crate::sink::OutputSink;

/// One batch run's synthesized output. Constructed once by the pipeline,
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedReport {
    pub items: Vec<UpdateRecord>,
    pub tldr: String,
}

/// Roadmap items get the talk-track treatment; everything else is a trend.
pub fn is_roadmap(rec: &UpdateRecord) -> bool {
    rec.category == "roadmap" || rec.source.contains("release")
}

/// Render the report through the injected sink, newest items first. The
/// date sort happens here, once, after aggregation and filtering.
pub fn render(report: &SynthesizedReport, days: i64, sink: &dyn OutputSink) {
    sink.line(&format!("=== FIELD PULSE (last {days} day(s)) ==="));

    if !report.tldr.is_empty() {
        sink.line("");
        sink.line(&format!("TLDR: {}", report.tldr));
    }

    if report.items.is_empty() {
        sink.line("");
        sink.line(&format!("No new insights found in the last {days} day(s)."));
        return;
    }

    let mut items = report.items.clone();
    sort_by_date_desc(&mut items);

    let roadmap: Vec<_> = items.iter().filter(|r| is_roadmap(r)).collect();
    if !roadmap.is_empty() {
        sink.line("");
        sink.line("-- Roadmap: field talk tracks --");
        for item in roadmap {
            sink.line(&format!("[{}] {}", item.source.to_uppercase(), item.title));
            if let Some(bridge) = &item.bridge {
                sink.line(&format!("  impact: {bridge}"));
            }
            if !item.source_url.is_empty() {
                sink.line(&format!("  docs: {}", item.source_url));
            }
        }
    }

    let trends: Vec<_> = items.iter().filter(|r| !is_roadmap(r)).collect();
    if !trends.is_empty() {
        sink.line("");
        sink.line("-- Knowledge & trends --");
        for item in trends {
            sink.line(&format!("{} ({})", item.title, item.description));
            if !item.summary.is_empty() {
                sink.line(&format!("  {}", item.summary));
            }
            if !item.tags.is_empty() {
                sink.line(&format!("  tags: {}", item.tags.join(", ")));
            }
            if !item.source_url.is_empty() {
                sink.line(&format!("  link: {}", item.source_url));
            }
        }
    }
}
