//! Process-wide service wiring.
//!
//! [`Services`] is built once at start-up from the loaded [`AppConfig`]. A
//! missing credential leaves the matching client out; operations that need it
//! then fail with a message naming the variable, while credential-free
//! operations (component listing, status, DOCX extraction) keep working.

use anyhow::{anyhow, Result};
use mdx_docs_core::components::{catalog, DocumentationComponent};
use mdx_docs_core::config::PublishDefaults;
use mdx_docs_core::contract::{RepositoryHost, TextRewriter};
use mdx_docs_core::convert::DocumentConverter;
use mdx_docs_core::extract::DocxExtractor;
use mdx_docs_core::publish::Publisher;
use std::sync::Arc;
use tracing::{info, warn};

use crate::gemini::GeminiClient;
use crate::github::GitHubClient;
use crate::load_config::{AppConfig, GEMINI_API_KEY_ENV, GITHUB_TOKEN_ENV};

pub struct Services<R: ?Sized, H> {
    converter: Option<DocumentConverter<DocxExtractor, R>>,
    publisher: Option<Publisher<H>>,
    extractor: DocxExtractor,
}

impl Services<GeminiClient, GitHubClient> {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let rewriter = GeminiClient::from_settings(&config.gemini).map(Arc::new);
        if rewriter.is_none() {
            warn!(env = GEMINI_API_KEY_ENV, "No Gemini API key, conversion is unavailable");
        }
        let host = GitHubClient::from_settings(&config.github)?;
        if host.is_none() {
            warn!(env = GITHUB_TOKEN_ENV, "No GitHub token, pull requests are unavailable");
        }
        Ok(Self::new(rewriter, host, config.publish.clone()))
    }
}

impl<R, H> Services<R, H>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    pub fn new(rewriter: Option<Arc<R>>, host: Option<H>, defaults: PublishDefaults) -> Self {
        info!(
            rewriter = rewriter.is_some(),
            host = host.is_some(),
            "Services initialised"
        );
        Self {
            converter: rewriter.map(|r| DocumentConverter::new(DocxExtractor::new(), r)),
            publisher: host.map(|h| Publisher::new(h, defaults)),
            extractor: DocxExtractor::new(),
        }
    }

    pub fn converter(&self) -> Result<&DocumentConverter<DocxExtractor, R>> {
        self.converter
            .as_ref()
            .ok_or_else(|| anyhow!("{GEMINI_API_KEY_ENV} environment variable is required"))
    }

    pub fn publisher(&self) -> Result<&Publisher<H>> {
        self.publisher
            .as_ref()
            .ok_or_else(|| anyhow!("{GITHUB_TOKEN_ENV} environment variable is required"))
    }

    pub fn extractor(&self) -> &DocxExtractor {
        &self.extractor
    }

    pub fn has_rewriter(&self) -> bool {
        self.converter.is_some()
    }

    pub fn has_host(&self) -> bool {
        self.publisher.is_some()
    }

    pub fn components(&self) -> &'static [DocumentationComponent] {
        catalog()
    }
}
