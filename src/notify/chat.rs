// src/notify/chat.rs
//! Chat-webhook delivery (Google Chat style card payload).

use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::report::{is_roadmap, SynthesizedReport};

const SECTION_CAP: usize = 3;

#[derive(Clone)]
pub struct ChatNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl ChatNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    pub async fn post_report(&self, report: &SynthesizedReport) -> Result<()> {
        if self.webhook.is_empty() {
            return Err(anyhow!("chat webhook URL not configured"));
        }
        if report.items.is_empty() {
            return Ok(());
        }

        let payload = card_payload(report);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("chat webhook HTTP error: {e}"));
                    }
                    tracing::info!("posted pulse report to chat webhook");
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("chat webhook request failed: {e}"));
                }
            }
        }
    }
}

/// Card payload: roadmap talk tracks first, then knowledge trends, both
/// capped so the chat message stays scannable.
pub fn card_payload(report: &SynthesizedReport) -> Value {
    let mut cards = Vec::new();

    let roadmap: Vec<Value> = report
        .items
        .iter()
        .filter(|i| is_roadmap(i))
        .take(SECTION_CAP)
        .map(|item| {
            json!({
                "header": format!("{}: {}", item.source.to_uppercase(), item.title),
                "widgets": [
                    {"textParagraph": {"text": item.bridge.clone().unwrap_or_else(|| "New roadmap update detected.".into())}},
                    {"buttons": [{"textButton": {"text": "OPEN DOCS", "onClick": {"openLink": {"url": item.source_url}}}}]}
                ]
            })
        })
        .collect();
    if !roadmap.is_empty() {
        cards.push(json!({
            "header": {"title": "FIELD PULSE: ROADMAP BRIDGE", "subtitle": "Actionable field intel"},
            "sections": roadmap
        }));
    }

    let trends: Vec<Value> = report
        .items
        .iter()
        .filter(|i| !is_roadmap(i))
        .take(SECTION_CAP)
        .map(|item| {
            let snippet: String = item.summary.chars().take(200).collect();
            json!({
                "header": item.title,
                "widgets": [
                    {"textParagraph": {"text": snippet}},
                    {"buttons": [{"textButton": {"text": "READ MORE", "onClick": {"openLink": {"url": item.source_url}}}}]}
                ]
            })
        })
        .collect();
    if !trends.is_empty() {
        cards.push(json!({
            "header": {"title": "AI KNOWLEDGE & TRENDS", "subtitle": "Market pulse"},
            "sections": trends
        }));
    }

    json!({ "cards": cards })
}
