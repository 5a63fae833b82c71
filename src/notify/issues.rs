// src/notify/issues.rs
//! Issue-tracker delivery: file the pulse report as a GitHub issue. Works
//! without email credentials, which makes it the easiest automated channel
//! in CI.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;

use crate::notify::markdown_report;
use crate::report::SynthesizedReport;

pub struct IssueNotifier {
    repo: String,
    token: String,
    client: Client,
}

impl IssueNotifier {
    /// `None` when GITHUB_REPOSITORY / GITHUB_TOKEN are not set; the
    /// caller logs and skips the channel.
    pub fn from_env() -> Option<Self> {
        let repo = std::env::var("GITHUB_REPOSITORY").ok()?;
        let token = std::env::var("GITHUB_TOKEN").ok()?;
        Some(Self::new(repo, token))
    }

    pub fn new(repo: String, token: String) -> Self {
        let client = Client::builder()
            .user_agent("field-pulse/0.1")
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            repo,
            token,
            client,
        }
    }

    pub async fn post_report(
        &self,
        report: &SynthesizedReport,
        date_range: Option<&str>,
    ) -> Result<()> {
        if report.items.is_empty() {
            return Ok(());
        }

        let suffix = date_range.map(|r| format!(" ({r})")).unwrap_or_default();
        let title = format!("Field Pulse: {} new updates{suffix}", report.items.len());
        let body = markdown_report(report, date_range);

        let url = format!("https://api.github.com/repos/{}/issues", self.repo);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .json(&json!({
                "title": title,
                "body": body,
                "labels": ["pulse", "automated"],
            }))
            .send()
            .await
            .context("issue http post")?;

        resp.error_for_status().context("issue creation rejected")?;
        tracing::info!(repo = %self.repo, "filed pulse report as issue");
        Ok(())
    }
}
