//! Component enhancement: turn Markdown-ish text into Docusaurus MDX.
//!
//! Two paths are offered by [`ComponentEnhancer`]:
//!
//! - [`ComponentEnhancer::enhance`] asks the rewriter to insert components
//!   and then makes sure the document has front-matter;
//! - [`ComponentEnhancer::convert_plain_to_mdx`] applies a fixed, ordered
//!   list of text substitutions and never calls the rewriter.
//!
//! Both paths leave text that already starts with front-matter untouched at
//! the top, so running either of them twice does not stack metadata blocks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::components::{catalog, DocumentationComponent};
use crate::contract::TextRewriter;
use crate::error::RewriteError;
use crate::rewrite::{self, RewriteRequest, RewriteTask};

/// Used when no line of the document qualifies as a description.
pub const DEFAULT_DESCRIPTION: &str = "Technical documentation";

const FRONTMATTER_DELIMITER: &str = "---";
const MIN_DESCRIPTION_LINE: usize = 20;
const MAX_DESCRIPTION: usize = 150;
const MIN_WORD_CUT: usize = 100;

// Ordered: admonitions first, then code block titles.
static ADMONITIONS: Lazy<[(Regex, &'static str); 4]> = Lazy::new(|| {
    [
        (admonition("Note"), ":::note\n${1}\n:::"),
        (admonition("Tip"), ":::tip\n${1}\n:::"),
        (admonition("Warning"), ":::warning\n${1}\n:::"),
        (admonition("Caution"), ":::caution\n${1}\n:::"),
    ]
});

static CODE_TITLE_COMMENT: Lazy<Regex> =
    Lazy::new(|| compile(r"```([A-Za-z0-9_]+)\n// ([^\r\n]+)\n"));
static CODE_TITLE_HEADING: Lazy<Regex> =
    Lazy::new(|| compile(r"```([A-Za-z0-9_]+)\n# ([^\r\n]+)\n"));

const CODE_TITLE_REPLACEMENT: &str = "```${1} title=\"${2}\"\n";

fn admonition(label: &str) -> Regex {
    compile(&format!(r"(?m)^> \*\*{label}:\*\* ([^\r\n]+)"))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex for built-in substitution")
}

/// Owns the component catalog and both enhancement paths.
pub struct ComponentEnhancer<R: ?Sized> {
    rewriter: Arc<R>,
}

impl<R: ?Sized> Clone for ComponentEnhancer<R> {
    fn clone(&self) -> Self {
        Self {
            rewriter: Arc::clone(&self.rewriter),
        }
    }
}

impl<R> ComponentEnhancer<R>
where
    R: TextRewriter + ?Sized,
{
    pub fn new(rewriter: Arc<R>) -> Self {
        Self { rewriter }
    }

    pub fn list_components(&self) -> &'static [DocumentationComponent] {
        catalog()
    }

    /// Delegated path: let the model insert components, then add front-matter.
    pub async fn enhance(&self, content: &str, title: Option<&str>) -> Result<String, RewriteError> {
        info!(title = ?title, "Enhancing content with Docusaurus components");
        let request = RewriteRequest::new(RewriteTask::DocumentationEnhancement, content, title);
        let enhanced = rewrite::run(self.rewriter.as_ref(), &request).await?;
        Ok(add_frontmatter(&enhanced, title))
    }

    /// Deterministic path: front-matter plus pattern substitutions.
    pub fn convert_plain_to_mdx(&self, markdown: &str, title: Option<&str>) -> String {
        plain_to_mdx(markdown, title)
    }
}

/// Front-matter insertion followed by the ordered substitutions.
pub fn plain_to_mdx(markdown: &str, title: Option<&str>) -> String {
    let with_frontmatter = add_frontmatter(markdown, title);
    let converted = apply_substitutions(&with_frontmatter);
    debug!(
        input_chars = markdown.len(),
        output_chars = converted.len(),
        "Applied deterministic MDX substitutions"
    );
    converted
}

/// Apply the admonition and code-title rules, in order.
pub fn apply_substitutions(markdown: &str) -> String {
    let mut mdx = markdown.to_string();
    for (pattern, replacement) in ADMONITIONS.iter() {
        mdx = pattern.replace_all(&mdx, *replacement).into_owned();
    }
    mdx = CODE_TITLE_COMMENT
        .replace_all(&mdx, CODE_TITLE_REPLACEMENT)
        .into_owned();
    CODE_TITLE_HEADING
        .replace_all(&mdx, CODE_TITLE_REPLACEMENT)
        .into_owned()
}

/// Prepend a front-matter block when a title is given and none exists yet.
pub fn add_frontmatter(content: &str, title: Option<&str>) -> String {
    if content.starts_with(FRONTMATTER_DELIMITER) {
        return content.to_string();
    }
    let Some(title) = title else {
        return content.to_string();
    };
    format!(
        "---\ntitle: {title}\ndescription: {}\n---\n\n{content}",
        derive_description(content)
    )
}

/// Pick a description from the first prose line of `content`.
///
/// Headings, admonition and fence delimiters, blank lines and lines of 20
/// characters or fewer are skipped. The chosen line is cut to 150 characters,
/// and further back to the last word boundary if that lies past 100.
pub fn derive_description(content: &str) -> String {
    let candidate = content
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .find(|line| {
            !line.starts_with('#')
                && !line.starts_with(":::")
                && !line.starts_with("```")
                && line.chars().count() > MIN_DESCRIPTION_LINE
        });

    let Some(line) = candidate else {
        return DEFAULT_DESCRIPTION.to_string();
    };

    let truncated: String = line.chars().take(MAX_DESCRIPTION).collect();
    match truncated.rfind(' ') {
        Some(pos) if truncated[..pos].chars().count() > MIN_WORD_CUT => {
            format!("{}...", &truncated[..pos])
        }
        _ => truncated,
    }
}
