//! # contract: data types and service seams of the pipeline
//!
//! The three external collaborators of mdx-docs sit behind traits defined here:
//!
//! - [`ContentExtractor`]: binary document bytes → plain text (and HTML)
//! - [`TextRewriter`]: prompt-driven rewriting by a generative model
//! - [`RepositoryHost`]: the branch/contents/pulls endpoints of a source-hosting API
//!
//! The core orchestrators ([`crate::convert::DocumentConverter`],
//! [`crate::publish::Publisher`]) only ever talk to these traits. Real
//! implementations live in the CLI crate (Gemini, GitHub) or next to the
//! trait ([`crate::extract::DocxExtractor`]).
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; with the default
//!   `test-export-mocks` feature the generated `Mock*` types are exported so
//!   downstream crates can script the collaborators in their own tests.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ExtractionError, HostError, RewriteError};
use crate::rewrite::RewriteRequest;

/// Declared format of an incoming document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Docx,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Text => f.write_str("text"),
            ContentType::Docx => f.write_str("docx"),
        }
    }
}

/// A document handed to the converter, tagged with its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDocument {
    Text(String),
    Docx(Vec<u8>),
}

impl SourceDocument {
    /// Decodes a base64 DOCX payload as sent by protocol clients.
    pub fn from_base64_docx(encoded: &str) -> Result<Self, ExtractionError> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Ok(SourceDocument::Docx(bytes))
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            SourceDocument::Text(_) => ContentType::Text,
            SourceDocument::Docx(_) => ContentType::Docx,
        }
    }
}

/// Caller choices for a single conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    pub title: Option<String>,
    /// Use the model to insert Docusaurus components (`true`), or convert to
    /// plain Markdown and apply the deterministic substitutions (`false`).
    pub enhance_with_components: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            title: None,
            enhance_with_components: true,
        }
    }
}

/// Output of an extraction. `html` is only filled when it was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    pub html: Option<String>,
    /// Advisory messages about content the extractor skipped.
    pub warnings: Vec<String>,
}

/// Trait for turning binary documents into text.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extract the plain text of the document.
    async fn extract_text(&self, bytes: &[u8]) -> Result<ExtractedContent, ExtractionError>;

    /// Extract both the plain text and an HTML rendering of the document.
    async fn extract_text_and_html(&self, bytes: &[u8])
        -> Result<ExtractedContent, ExtractionError>;
}

/// Trait for a generative text-completion backend.
///
/// Implementations shape the provider request and response; the prompt
/// itself is composed by [`RewriteRequest::prompt`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TextRewriter: Send + Sync {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError>;
}

/// Everything needed to publish one file as a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRequest {
    pub owner: String,
    pub repo: String,
    pub file_path: String,
    pub content: String,
    pub commit_message: String,
    pub pr_title: String,
    /// Falls back to the publisher's configured default description.
    pub pr_description: Option<String>,
    /// Falls back to `branch_prefix + unix-millis`.
    pub branch_name: Option<String>,
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestResult {
    pub pull_request_url: String,
    pub branch_name: String,
    pub commit_sha: String,
}

/// A file that already exists in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryFile {
    pub path: String,
    /// Blob SHA; the contents API requires it to overwrite the file.
    pub sha: String,
}

/// A single-file commit on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub message: String,
    pub content_base64: String,
    pub branch: String,
    /// Blob SHA of the file being replaced, `None` when creating it.
    pub sha: Option<String>,
}

/// Parameters of a pull request to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub owner: String,
    pub repo: String,
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

/// Trait for the source-hosting API used by the publisher.
///
/// Each method maps to one REST call. None of them retry.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Name of the repository's default branch.
    async fn default_branch(&self, owner: &str, repo: &str) -> Result<String, HostError>;

    /// Commit SHA at the tip of `branch`.
    async fn branch_sha(&self, owner: &str, repo: &str, branch: &str)
        -> Result<String, HostError>;

    /// Create `refs/heads/{branch}` pointing at `sha`.
    async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), HostError>;

    /// Look up a file on `reference`; `Ok(None)` when it does not exist.
    async fn get_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: &str,
    ) -> Result<Option<RepositoryFile>, HostError>;

    /// Create or update a file, returning the SHA of the resulting commit.
    async fn put_file(&self, commit: &FileCommit) -> Result<String, HostError>;

    /// Open a pull request, returning its web URL.
    async fn create_pull_request(&self, pull: &NewPullRequest) -> Result<String, HostError>;

    /// Names of the entries at `path` (a single name when `path` is a file).
    async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<String>, HostError>;
}
