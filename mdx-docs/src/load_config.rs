//! `load_config` module: merges the optional YAML config file with the environment.
//!
//! Secrets never come from the file. `GEMINI_API_KEY` and `GITHUB_TOKEN` are
//! read from the environment (a `.env` file is loaded by `main` through
//! `dotenvy`); `GEMINI_MODEL` and `GITHUB_API_URL` override the file values.
//!
//! Accepted YAML, every key optional:
//!
//! ```yaml
//! gemini:
//!   model: gemini-1.5-flash
//!   api_base: https://generativelanguage.googleapis.com
//! github:
//!   api_base: https://api.github.com
//! publish:
//!   branch_prefix: mdx-docs-
//!   default_description: Automated documentation update via MDX-GDocs MCP Server
//! ```
//!
//! # Errors
//! All errors use `anyhow::Error` and are surfaced at the CLI boundary.

use anyhow::{Context, Result};
use mdx_docs_core::config::PublishDefaults;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GEMINI_MODEL_ENV: &str = "GEMINI_MODEL";
pub const GITHUB_API_URL_ENV: &str = "GITHUB_API_URL";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

#[derive(Clone)]
pub struct GitHubSettings {
    pub token: Option<String>,
    pub api_base: String,
}

/// Everything the binary needs to build its services.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiSettings,
    pub github: GitHubSettings,
    pub publish: PublishDefaults,
}

fn redacted(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "<set>"
    } else {
        "<missing>"
    }
}

impl fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &redacted(&self.api_key))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("token", &redacted(&self.token))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl AppConfig {
    pub fn trace_loaded(&self) {
        info!(
            gemini_model = %self.gemini.model,
            gemini_api_key_set = self.gemini.api_key.is_some(),
            github_api_base = %self.github.api_base,
            github_token_set = self.github.token.is_some(),
            "Loaded Config"
        );
        self.publish.trace_loaded();
        debug!(?self, "Config loaded (full debug)");
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    gemini: RawGemini,
    github: RawGitHub,
    publish: PublishDefaults,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGemini {
    model: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGitHub {
    api_base: Option<String>,
}

/// Load the config file at `path` (if any) and merge in the environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let raw = match path {
        Some(path) => read_config_file(path)?,
        None => {
            info!("No config file given, using defaults and environment");
            RawConfig::default()
        }
    };

    let config = AppConfig {
        gemini: GeminiSettings {
            api_key: env_value(GEMINI_API_KEY_ENV),
            model: env_value(GEMINI_MODEL_ENV)
                .or(raw.gemini.model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            api_base: raw
                .gemini
                .api_base
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
        },
        github: GitHubSettings {
            token: env_value(GITHUB_TOKEN_ENV),
            api_base: env_value(GITHUB_API_URL_ENV)
                .or(raw.github.api_base)
                .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string()),
        },
        publish: raw.publish,
    };
    config.trace_loaded();
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<RawConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            e
        })
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    // An empty file deserializes to `null`; treat it as "all defaults".
    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }

    let raw: RawConfig = serde_yaml::from_str(&content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            e
        })
        .context("Failed to parse config YAML")?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(raw)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
