//! TOML configuration.
//!
//! Loaded once at startup by [`load_config`] and passed by reference (or
//! `Arc`) into the store, enricher, browser, and server. The enrichment API
//! key is resolved from the environment here and nowhere else.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_mb: default_max_upload_mb(),
            extract_timeout_secs: default_extract_timeout_secs(),
        }
    }
}

impl StorageConfig {
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}
fn default_max_upload_mb() -> u64 {
    50
}
fn default_extract_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Resolved credential. Filled by [`load_config`] from `api_key_env`
    /// when not given inline.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            api_key_env: None,
            api_key: None,
            base_url: None,
            temperature: 0.2,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_timeout_secs() -> u64 {
    30
}

impl EnrichmentConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Model to request, falling back to the provider's default.
    pub fn model_or_default(&self) -> &str {
        match (&self.model, self.provider.as_str()) {
            (Some(m), _) => m,
            (None, "gemini") => "gemini-2.5-flash",
            (None, _) => "gpt-4o-mini",
        }
    }

    fn key_env_or_default(&self) -> &str {
        match (&self.api_key_env, self.provider.as_str()) {
            (Some(name), _) => name,
            (None, "gemini") => "GEMINI_API_KEY",
            (None, _) => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
    /// Run Chromium with its sandbox. Disable only in containers that lack
    /// the required kernel features.
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: default_navigation_timeout_secs(),
            chrome_path: None,
            sandbox: default_sandbox(),
        }
    }
}

fn default_navigation_timeout_secs() -> u64 {
    45
}
fn default_sandbox() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// Reads, validates, and resolves the configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    if config.enrichment.is_enabled() && config.enrichment.api_key.is_none() {
        // Picks up a .env file during development.
        let _ = dotenvy::dotenv();
        config.enrichment.api_key = std::env::var(config.enrichment.key_env_or_default())
            .ok()
            .filter(|k| !k.trim().is_empty());
    }

    Ok(config)
}

/// Parses and validates configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.storage.max_upload_mb == 0 {
        anyhow::bail!("storage.max_upload_mb must be > 0");
    }
    if config.storage.extract_timeout_secs == 0 {
        anyhow::bail!("storage.extract_timeout_secs must be > 0");
    }
    if config.browser.navigation_timeout_secs == 0 {
        anyhow::bail!("browser.navigation_timeout_secs must be > 0");
    }
    if config.enrichment.timeout_secs == 0 {
        anyhow::bail!("enrichment.timeout_secs must be > 0");
    }

    match config.enrichment.provider.as_str() {
        "disabled" | "openai" | "gemini" => {}
        other => anyhow::bail!(
            "Unknown enrichment provider: '{}'. Must be disabled, openai, or gemini.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[db]
path = "./data/ascan.sqlite"

[server]
bind = "127.0.0.1:7340"
"#;

    #[test]
    fn defaults_apply_to_minimal_config() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.storage.max_upload_mb, 50);
        assert_eq!(config.storage.max_upload_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.browser.navigation_timeout_secs, 45);
        assert!(config.browser.sandbox);
        assert!(!config.enrichment.is_enabled());
        assert_eq!(config.enrichment.timeout_secs, 30);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let text = format!("{}\n[enrichment]\nprovider = \"claude-ish\"\n", MINIMAL);
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("Unknown enrichment provider"));
    }

    #[test]
    fn provider_defaults_pick_model() {
        let text = format!("{}\n[enrichment]\nprovider = \"gemini\"\n", MINIMAL);
        let config = parse_config(&text).unwrap();
        assert_eq!(config.enrichment.model_or_default(), "gemini-2.5-flash");
        assert_eq!(config.enrichment.key_env_or_default(), "GEMINI_API_KEY");
    }

    #[test]
    fn zero_upload_limit_is_rejected() {
        let text = format!("{}\n[storage]\nmax_upload_mb = 0\n", MINIMAL);
        assert!(parse_config(&text).is_err());
    }
}
