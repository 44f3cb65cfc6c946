//! Conversion orchestrator: source document → MDX.
//!
//! The pipeline is strictly sequential:
//!
//! ```text
//! Extracting ──▶ Cleaning ──▶ Enhancing ──▶ Done
//!      └────────────┴─────────────┴──────▶ Failed
//! ```
//!
//! DOCX input goes through the [`ContentExtractor`] first; text input is used
//! as-is. The cleaned text is then either handed to the model for component
//! insertion, or converted to plain Markdown and run through the deterministic
//! substitutions of [`crate::enhance`].

use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::contract::{ContentExtractor, ConversionOptions, SourceDocument, TextRewriter};
use crate::enhance::ComponentEnhancer;
use crate::error::ConversionError;
use crate::normalize;
use crate::rewrite::{self, RewriteRequest, RewriteTask, CLEANUP_CONTEXT};

/// Stage of a running conversion, used in log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Extracting,
    Cleaning,
    Enhancing,
    Done,
    Failed,
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConversionState::Extracting => "extracting",
            ConversionState::Cleaning => "cleaning",
            ConversionState::Enhancing => "enhancing",
            ConversionState::Done => "done",
            ConversionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

pub struct DocumentConverter<E, R: ?Sized> {
    extractor: E,
    rewriter: Arc<R>,
    enhancer: ComponentEnhancer<R>,
}

impl<E, R> DocumentConverter<E, R>
where
    E: ContentExtractor,
    R: TextRewriter + ?Sized,
{
    pub fn new(extractor: E, rewriter: Arc<R>) -> Self {
        let enhancer = ComponentEnhancer::new(Arc::clone(&rewriter));
        Self {
            extractor,
            rewriter,
            enhancer,
        }
    }

    /// Run the full pipeline on `document`.
    pub async fn convert_to_mdx(
        &self,
        document: &SourceDocument,
        options: &ConversionOptions,
    ) -> Result<String, ConversionError> {
        let content_type = document.content_type();
        info!(
            content_type = %content_type,
            title = ?options.title,
            components = options.enhance_with_components,
            state = %ConversionState::Extracting,
            "Starting document conversion"
        );

        let result = self.run_pipeline(document, options).await;
        match &result {
            Ok(mdx) => info!(
                content_type = %content_type,
                mdx_chars = mdx.len(),
                state = %ConversionState::Done,
                "Document conversion finished"
            ),
            Err(e) => error!(
                content_type = %content_type,
                error = %e,
                state = %ConversionState::Failed,
                "Document conversion failed"
            ),
        }
        result
    }

    async fn run_pipeline(
        &self,
        document: &SourceDocument,
        options: &ConversionOptions,
    ) -> Result<String, ConversionError> {
        let title = options.title.as_deref();

        let raw = match document {
            SourceDocument::Docx(bytes) => self.extractor.extract_text(bytes).await?.text,
            SourceDocument::Text(text) => text.clone(),
        };

        info!(state = %ConversionState::Cleaning, chars = raw.len(), "Cleaning document structure");
        let cleanup = RewriteRequest::new(
            RewriteTask::StructuralCleanup {
                context: Some(CLEANUP_CONTEXT.to_string()),
            },
            raw,
            title,
        );
        let cleaned = rewrite::run(self.rewriter.as_ref(), &cleanup).await?;

        info!(
            state = %ConversionState::Enhancing,
            components = options.enhance_with_components,
            "Producing MDX"
        );
        if options.enhance_with_components {
            Ok(self.enhancer.enhance(&cleaned, title).await?)
        } else {
            let request = RewriteRequest::new(RewriteTask::MarkdownConversion, cleaned, title);
            let markdown = rewrite::run(self.rewriter.as_ref(), &request).await?;
            Ok(self.enhancer.convert_plain_to_mdx(&markdown, title))
        }
    }

    /// Rewrite `text` following a caller-supplied instruction.
    pub async fn convert_with_custom_prompt(
        &self,
        text: &str,
        instruction: &str,
    ) -> Result<String, ConversionError> {
        info!(instruction_chars = instruction.len(), "Rewriting with custom instruction");
        let request = RewriteRequest::new(RewriteTask::Custom(instruction.to_string()), text, None);
        Ok(rewrite::run(self.rewriter.as_ref(), &request).await?)
    }
}

/// DOCX → Markdown without involving the model: extract HTML, then normalize.
pub async fn docx_to_markdown<E>(extractor: &E, bytes: &[u8]) -> Result<String, ConversionError>
where
    E: ContentExtractor + ?Sized,
{
    let extracted = extractor.extract_text_and_html(bytes).await?;
    match extracted.html {
        Some(html) => Ok(normalize::html_to_markdown(&html)?),
        None => Ok(extracted.text.trim().to_string()),
    }
}
