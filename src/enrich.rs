//! AI remediation suggestions for findings.
//!
//! [`Enricher::enrich`] never fails: a missing credential, a network error,
//! a non-success status, or unparseable output all leave the findings
//! exactly as they were. Suggestions are merged back by position.
//!
//! # Providers
//!
//! | Config Value | Client |
//! |-------------|--------|
//! | `"disabled"` | none (enrichment is a no-op) |
//! | `"openai"` | [`OpenAiClient`], `POST /v1/chat/completions` |
//! | `"gemini"` | [`GeminiClient`], `POST /v1beta/models/{model}:generateContent` |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use access_scan_core::models::Finding;
use access_scan_core::suggest::{
    build_prompt, merge_suggestions, parse_suggestions, SuggestionResponse,
};

use crate::config::EnrichmentConfig;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// A generative text service that completes a single prompt.
#[async_trait]
pub trait SuggestionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn error_body(response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    anyhow!("API error {}: {}", status, body)
}

// ============ OpenAI ============

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(config: &EnrichmentConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            api_key,
            model: config.model_or_default().to_string(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl SuggestionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(format!(
                "{}/v1/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_body(response).await);
        }

        let json: serde_json::Value = response.json().await?;
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing message content"))
    }
}

// ============ Gemini ============

/// `generateContent` client for Google Gemini models.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(config: &EnrichmentConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            api_key,
            model: config.model_or_default().to_string(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl SuggestionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        let response = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url.trim_end_matches('/'),
                self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_body(response).await);
        }

        let json: serde_json::Value = response.json().await?;
        let parts = json
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidate parts"))?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if text.is_empty() {
            bail!("Invalid Gemini response: empty text");
        }
        Ok(text)
    }
}

// ============ Enricher ============

/// Attaches AI suggestions to findings, degrading silently on any failure.
#[derive(Clone, Default)]
pub struct Enricher {
    client: Option<Arc<dyn SuggestionClient>>,
}

impl Enricher {
    /// An enricher that never calls out.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn with_client(client: Arc<dyn SuggestionClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Builds the enricher for the configured provider.
    ///
    /// A configured provider with no resolved credential yields a disabled
    /// enricher (logged), not an error.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self> {
        if !config.is_enabled() {
            return Ok(Self::disabled());
        }
        let api_key = match config.api_key.clone() {
            Some(k) => k,
            None => {
                warn!(
                    "Enrichment provider '{}' has no API key; suggestions will use defaults",
                    config.provider
                );
                return Ok(Self::disabled());
            }
        };
        let client: Arc<dyn SuggestionClient> = match config.provider.as_str() {
            "openai" => Arc::new(OpenAiClient::new(config, api_key)?),
            "gemini" => Arc::new(GeminiClient::new(config, api_key)?),
            other => bail!("Unknown enrichment provider: {}", other),
        };
        info!(
            "Enrichment enabled: provider={}, model={}",
            config.provider,
            config.model_or_default()
        );
        Ok(Self::with_client(client))
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Returns `findings` with suggestions replaced by position where the
    /// service supplied one. Never fails.
    pub async fn enrich(&self, findings: Vec<Finding>, source_name: &str) -> Vec<Finding> {
        let client = match self.client {
            Some(ref c) if !findings.is_empty() => c,
            _ => return findings,
        };

        let prompt = build_prompt(&findings, source_name);
        let raw = match client.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Suggestion request for {} failed: {:#}", source_name, e);
                return findings;
            }
        };
        debug!("Suggestion response ({} bytes)", raw.len());

        match parse_suggestions(&raw) {
            SuggestionResponse::Structured(fixes) if !fixes.is_empty() => {
                if fixes.len() != findings.len() {
                    debug!(
                        "Suggestion count mismatch: {} for {} findings",
                        fixes.len(),
                        findings.len()
                    );
                }
                merge_suggestions(findings, &fixes)
            }
            _ => {
                warn!("Suggestion response for {} was empty or unparseable", source_name);
                findings
            }
        }
    }
}
