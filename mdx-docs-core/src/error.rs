//! Error taxonomy for the conversion and publishing pipelines.
//!
//! Every component returns its own error type; the orchestrators wrap them
//! ([`ConversionError`], [`PublishError`]) and hand them to the surface
//! adapters untouched. Nothing in the core retries or recovers.

use std::fmt;
use thiserror::Error;

/// Failure turning document bytes into text or HTML.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input claimed to be base64 but did not decode.
    #[error("document is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// The bytes are not a readable OOXML archive.
    #[error("document is not a valid DOCX archive: {0}")]
    InvalidArchive(#[from] zip::result::ZipError),

    /// A part every DOCX must contain is missing.
    #[error("DOCX archive has no {0} part")]
    MissingPart(&'static str),

    #[error("failed to read DOCX part: {0}")]
    Io(#[from] std::io::Error),

    /// The main document part is not well-formed XML.
    #[error("malformed DOCX XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A blocking extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Failure converting HTML to Markdown.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("failed to parse HTML: {0}")]
    Parse(#[from] std::io::Error),
}

/// Failure of the generative rewriter.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The provider could not be reached at all.
    #[error("generative provider unreachable: {0}")]
    Unreachable(String),

    /// The provider answered with an error; `message` is its own text.
    #[error("generative provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider answered successfully but without any text.
    #[error("generative provider returned an empty response")]
    EmptyResponse,

    /// The provider answered with a body we could not understand.
    #[error("unexpected response from generative provider: {0}")]
    Malformed(String),
}

/// Failure anywhere in the document → MDX pipeline.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Document conversion failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Document conversion failed: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("Document conversion failed: {0}")]
    Rewrite(#[from] RewriteError),
}

/// Failure reported by a source-hosting backend.
#[derive(Debug, Error)]
pub enum HostError {
    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// The publishing step that was running when a [`PublishError`] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    ResolveDefaultBranch,
    ResolveBranchSha,
    CreateBranch,
    LookupExistingFile,
    WriteFile,
    OpenPullRequest,
    ListFiles,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PublishStep::ResolveDefaultBranch => "resolve default branch",
            PublishStep::ResolveBranchSha => "resolve branch sha",
            PublishStep::CreateBranch => "create branch",
            PublishStep::LookupExistingFile => "look up existing file",
            PublishStep::WriteFile => "write file",
            PublishStep::OpenPullRequest => "open pull request",
            PublishStep::ListFiles => "list files",
        };
        f.write_str(label)
    }
}

/// Failure in the branch → commit → pull request sequence.
///
/// Steps that already succeeded are not rolled back: a failure after
/// [`PublishStep::CreateBranch`] leaves the branch in the repository.
#[derive(Debug, Error)]
#[error("repository step '{step}' failed: {source}")]
pub struct PublishError {
    pub step: PublishStep,
    #[source]
    pub source: HostError,
}

impl PublishError {
    pub fn at(step: PublishStep) -> impl FnOnce(HostError) -> PublishError {
        move |source| PublishError { step, source }
    }
}
