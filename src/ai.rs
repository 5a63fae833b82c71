// src/ai.rs
//! Completion-service boundary: provider abstraction + config + factory.
//!
//! The pipeline treats the service as prompt-in/text-out and never trusts
//! its output. A missing or disabled configuration is expressed as `None`
//! rather than a stub client, so every call site owns its fallback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// One prompt in, untrusted text out. May fail transiently (network,
    /// rate limit); callers wrap with the shared retry policy.
    async fn generate(&self, prompt: &str) -> Result<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynCompletion = Arc<dyn CompletionClient>;

// ------------------------------------------------------------
// Config
// ------------------------------------------------------------

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}

/// Loaded from `config/ai.json`. `api_key = "ENV"` defers to the
/// provider's environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
        }
    }
}

/// Read `config/ai.json`; any read/parse failure yields the disabled
/// default so a broken config degrades instead of aborting the run.
pub fn load_ai_config() -> AiConfig {
    match std::fs::read_to_string("config/ai.json") {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => AiConfig::default(),
    }
}

impl AiConfig {
    fn resolve_api_key(&self) -> Result<String> {
        if !self.api_key.trim().eq_ignore_ascii_case("env") {
            return Ok(self.api_key.clone());
        }
        match self.provider.to_lowercase().as_str() {
            "gemini" => std::env::var("GEMINI_API_KEY")
                .map_err(|_| anyhow!("Missing GEMINI_API_KEY env var")),
            other => Err(anyhow!("Unsupported provider in config: {other}")),
        }
    }
}

/// Factory: build a client according to config and environment.
///
/// * `AI_TEST_MODE=mock` returns a deterministic mock client.
/// * A disabled config, unsupported provider, or missing key returns
///   `None`; the pipeline then falls back to its rule-based paths.
pub fn build_completion_client(config: &AiConfig) -> Option<DynCompletion> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Some(Arc::new(MockClient::replying(
            "Mock field note: no customer impact identified.",
        )));
    }

    if !config.enabled {
        return None;
    }

    match config.provider.to_lowercase().as_str() {
        "gemini" => match config.resolve_api_key() {
            Ok(key) if !key.is_empty() => {
                Some(Arc::new(GeminiClient::new(key, config.model.clone())))
            }
            Ok(_) | Err(_) => {
                tracing::warn!("completion service enabled but no usable API key; disabling");
                None
            }
        },
        other => {
            tracing::warn!(provider = other, "unsupported completion provider; disabling");
            None
        }
    }
}

// ------------------------------------------------------------
// Gemini provider
// ------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("field-pulse/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            text: String,
        }
        #[derive(Deserialize)]
        struct RespContent {
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct Resp {
            candidates: Vec<Candidate>,
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("completion http post")?;

        if !resp.status().is_success() {
            anyhow::bail!("completion service returned {}", resp.status());
        }

        let body: Resp = resp.json().await.context("completion response body")?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            anyhow::bail!("completion service returned no text");
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Mock provider for tests/local runs
// ------------------------------------------------------------

/// Records every prompt; replies with a fixed string or fails on demand.
pub struct MockClient {
    reply: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompts poisoned").len()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompts poisoned")
            .push(prompt.to_string());
        if self.fail {
            anyhow::bail!("mock completion failure");
        }
        Ok(self.reply.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
