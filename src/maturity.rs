// src/maturity.rs
//! Package-maturity auditor: fetch registry metadata for a crate and ask
//! the completion service for a production-readiness read.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ai::DynCompletion;
use crate::retry::{retry, RetryPolicy};

pub const NO_WISDOM: &str = "Unable to synthesize a maturity read at this time.";

#[derive(Debug, Deserialize)]
struct RegistryResp {
    #[serde(rename = "crate")]
    krate: RegistryCrate,
}

#[derive(Debug, Deserialize)]
struct RegistryCrate {
    name: String,
    max_version: String,
    description: Option<String>,
    downloads: u64,
    created_at: String,
    updated_at: String,
    repository: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaturityReport {
    pub name: String,
    pub version: String,
    pub description: String,
    pub downloads: u64,
    pub created_at: String,
    pub last_release_at: String,
    pub repository: Option<String>,
    pub wisdom: String,
}

pub struct MaturityAuditor {
    http: reqwest::Client,
    completion: Option<DynCompletion>,
    policy: RetryPolicy,
}

impl MaturityAuditor {
    pub fn new(completion: Option<DynCompletion>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("field-pulse/0.1 (maturity-audit)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            completion,
            policy: RetryPolicy::default(),
        }
    }

    /// Registry failures are real errors (the caller asked for exactly
    /// this package); a missing completion service only degrades the
    /// wisdom section.
    pub async fn audit(&self, package: &str) -> Result<MaturityReport> {
        let url = format!("https://crates.io/api/v1/crates/{package}");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("registry http get")?;
        if !resp.status().is_success() {
            anyhow::bail!("package {package} not found on the registry ({})", resp.status());
        }
        let body: RegistryResp = resp.json().await.context("registry response body")?;
        let k = body.krate;

        let mut report = MaturityReport {
            name: k.name,
            version: k.max_version,
            description: k.description.unwrap_or_default(),
            downloads: k.downloads,
            created_at: k.created_at,
            last_release_at: k.updated_at,
            repository: k.repository,
            wisdom: NO_WISDOM.to_string(),
        };
        report.wisdom = self.synthesize_wisdom(&report).await;
        Ok(report)
    }

    async fn synthesize_wisdom(&self, report: &MaturityReport) -> String {
        let Some(client) = &self.completion else {
            return NO_WISDOM.to_string();
        };
        let prompt = format!(
            "You are a principal architect performing a technical maturity audit on a library.\n\n\
             Package: {}\nVersion: {}\nDownloads: {}\nFirst release: {}\nLast release: {}\nDescription: {}\n\n\
             Summarize the maturity and capabilities in 3 sections:\n\
             1. KEY CAPABILITIES: what does it let architects build?\n\
             2. MATURITY SCORE: is it production-ready? (Early Alpha, Stable, Enterprise Grade)\n\
             3. FIELD PLAY: how should this be positioned to customers?\n\
             Return a clean, bulleted synthesis.",
            report.name,
            report.version,
            report.downloads,
            report.created_at,
            report.last_release_at,
            report.description
        );
        match retry(self.policy, || async { client.generate(&prompt).await }).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = ?e, package = %report.name, "maturity synthesis failed");
                NO_WISDOM.to_string()
            }
        }
    }
}
