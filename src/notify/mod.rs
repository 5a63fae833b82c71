// src/notify/mod.rs
//! Delivery channels for the synthesized report. Each channel is a thin
//! renderer over the already-enriched report; missing credentials are a
//! soft-disable with a warning, never a run failure.

pub mod chat;
pub mod email;
pub mod issues;

use crate::report::SynthesizedReport;

/// Shared markdown rendering used by the issue channel (and handy for
/// any plain-text consumer).
pub fn markdown_report(report: &SynthesizedReport, date_range: Option<&str>) -> String {
    let mut out = String::from("# Field Pulse\n");
    if let Some(range) = date_range {
        out.push_str(&format!("**Pulse period:** {range}\n"));
    }
    out.push_str("\n## Executive synthesis\n");
    out.push_str(&report.tldr);
    out.push_str("\n\n---\n\n");
    for item in &report.items {
        out.push_str(&format!("### {}\n", item.title));
        out.push_str(&format!("*Source: {}*\n\n", item.source));
        if let Some(bridge) = &item.bridge {
            out.push_str(&format!("**Field impact:** {bridge}\n\n"));
        }
        if !item.summary.is_empty() {
            out.push_str(&format!("{}\n\n", item.summary));
        }
        if !item.tags.is_empty() {
            out.push_str(&format!("Tags: {}\n\n", item.tags.join(", ")));
        }
        if !item.source_url.is_empty() {
            out.push_str(&format!("[Read full update]({})\n\n", item.source_url));
        }
        out.push_str("---\n\n");
    }
    out
}
