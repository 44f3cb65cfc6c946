//! Instructions for the generative rewriter.
//!
//! A [`RewriteRequest`] pairs the text to rewrite with a [`RewriteTask`];
//! [`RewriteRequest::prompt`] renders the full prompt so that every provider
//! sends the model the same instructions.

use tracing::{debug, error};

use crate::contract::TextRewriter;
use crate::error::RewriteError;

/// Context passed to the structural cleanup step of a conversion.
pub const CLEANUP_CONTEXT: &str =
    "Convert to well-structured markdown suitable for technical documentation";

/// What the model is asked to do with the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteTask {
    /// Reorganise into a logical heading hierarchy, keeping the input format.
    StructuralCleanup { context: Option<String> },
    /// Produce clean Markdown.
    MarkdownConversion,
    /// Produce MDX with Docusaurus components.
    DocumentationEnhancement,
    /// Caller-provided instruction, applied like a structural cleanup.
    Custom(String),
}

impl RewriteTask {
    pub fn name(&self) -> &'static str {
        match self {
            RewriteTask::StructuralCleanup { .. } => "structural_cleanup",
            RewriteTask::MarkdownConversion => "markdown_conversion",
            RewriteTask::DocumentationEnhancement => "documentation_enhancement",
            RewriteTask::Custom(_) => "custom",
        }
    }
}

/// A single call to the rewriter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub task: RewriteTask,
    pub text: String,
    pub title: Option<String>,
}

impl RewriteRequest {
    pub fn new(task: RewriteTask, text: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            task,
            text: text.into(),
            title: title.map(str::to_owned),
        }
    }

    /// Render the prompt sent to the model.
    pub fn prompt(&self) -> String {
        let title_line = self
            .title
            .as_deref()
            .map(|t| format!("Document title: {t}\n"))
            .unwrap_or_default();

        match &self.task {
            RewriteTask::DocumentationEnhancement => format!(
                "
You are an expert technical writer who specializes in converting content to MDX format with Docusaurus components.

Convert the following content to MDX format with appropriate Docusaurus components. Follow these guidelines:

1. Use proper MDX syntax with frontmatter if a title is provided
2. Add appropriate Docusaurus components like:
   - Admonitions (:::note, :::tip, :::warning, :::caution, :::danger)
   - Code blocks with syntax highlighting
   - Tabs for multiple options/examples
   - Details/Summary for collapsible content
3. Structure the content with proper headings
4. Make it engaging and well-formatted for technical documentation
5. Preserve all important information from the original content

{title_line}

Original content:
{text}

Return only the MDX content with Docusaurus components, no explanations.
",
                text = self.text
            ),
            RewriteTask::MarkdownConversion => format!(
                "
Convert the following content to clean, well-structured Markdown format.

Requirements:
1. Use proper Markdown syntax
2. Create logical heading hierarchy
3. Format lists, code blocks, and tables appropriately
4. Preserve all important information
5. Make it readable and well-organized

{title_line}

Content to convert:
{text}

Return only the Markdown content, no explanations.
",
                text = self.text
            ),
            RewriteTask::StructuralCleanup { context } => {
                structure_prompt(context.as_deref(), &self.text)
            }
            RewriteTask::Custom(instruction) => structure_prompt(Some(instruction), &self.text),
        }
    }
}

fn structure_prompt(context: Option<&str>, text: &str) -> String {
    let context_line = context
        .map(|c| format!("Context: {c}\n"))
        .unwrap_or_default();
    format!(
        "
Improve the structure and formatting of this document content.

Requirements:
1. Create clear sections with appropriate headings
2. Improve readability and flow
3. Fix any formatting issues
4. Organize information logically
5. Keep all original information intact

{context_line}

Content to improve:
{text}

Return the improved content in the same format.
"
    )
}

/// Send `request` to `rewriter`, rejecting blank answers.
pub async fn run<R>(rewriter: &R, request: &RewriteRequest) -> Result<String, RewriteError>
where
    R: TextRewriter + ?Sized,
{
    debug!(
        task = request.task.name(),
        input_chars = request.text.len(),
        "Sending rewrite request"
    );
    let output = rewriter.rewrite(request).await.map_err(|e| {
        error!(task = request.task.name(), error = %e, "Rewrite failed");
        e
    })?;
    if output.trim().is_empty() {
        error!(task = request.task.name(), "Rewriter returned empty output");
        return Err(RewriteError::EmptyResponse);
    }
    debug!(
        task = request.task.name(),
        output_chars = output.len(),
        "Rewrite complete"
    );
    Ok(output)
}
