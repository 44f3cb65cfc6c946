//! DOCX text and HTML extraction.
//!
//! A DOCX file is a zip archive; the body lives in `word/document.xml`,
//! hyperlink targets in `word/_rels/document.xml.rels` and list formats in
//! `word/numbering.xml`. Only the main document part is mandatory.

use async_trait::async_trait;
use futures::future::try_join;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::contract::{ContentExtractor, ExtractedContent};
use crate::error::ExtractionError;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const DOCUMENT_PART: &str = "word/document.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";
const NUMBERING_PART: &str = "word/numbering.xml";

/// Embedded objects we cannot render as text.
const UNSUPPORTED: [(&str, &str); 3] = [
    ("drawing", "drawing or image"),
    ("pict", "legacy picture"),
    ("object", "embedded object"),
];

/// [`ContentExtractor`] for Office Open XML word-processing documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentExtractor for DocxExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> Result<ExtractedContent, ExtractionError> {
        info!(bytes = bytes.len(), "Extracting text from DOCX");
        let (text, warnings) = blocking(Arc::new(bytes.to_vec()), render_text).await?;
        log_warnings(&warnings);
        debug!(chars = text.len(), "DOCX text extracted");
        Ok(ExtractedContent {
            text,
            html: None,
            warnings,
        })
    }

    async fn extract_text_and_html(
        &self,
        bytes: &[u8],
    ) -> Result<ExtractedContent, ExtractionError> {
        info!(bytes = bytes.len(), "Extracting text and HTML from DOCX");
        let shared = Arc::new(bytes.to_vec());
        let ((text, warnings), html) = try_join(
            blocking(Arc::clone(&shared), render_text),
            blocking(shared, render_html),
        )
        .await?;
        log_warnings(&warnings);
        debug!(
            text_chars = text.len(),
            html_chars = html.len(),
            "DOCX text and HTML extracted"
        );
        Ok(ExtractedContent {
            text,
            html: Some(html),
            warnings,
        })
    }
}

async fn blocking<T>(
    bytes: Arc<Vec<u8>>,
    render: fn(&[u8]) -> Result<T, ExtractionError>,
) -> Result<T, ExtractionError>
where
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || render(&bytes))
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))?
}

fn log_warnings(warnings: &[String]) {
    for message in warnings {
        warn!(warning = %message, "DOCX content skipped");
    }
}

struct DocxPackage {
    document: String,
    relationships: Option<String>,
    numbering: Option<String>,
}

impl DocxPackage {
    fn open(bytes: &[u8]) -> Result<Self, ExtractionError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let document =
            read_part(&mut archive, DOCUMENT_PART)?.ok_or(ExtractionError::MissingPart(DOCUMENT_PART))?;
        Ok(Self {
            document,
            relationships: read_part(&mut archive, RELATIONSHIPS_PART)?,
            numbering: read_part(&mut archive, NUMBERING_PART)?,
        })
    }
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ExtractionError> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn is_w(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(W_NS)
}

fn w_child<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_w(c, name))
}

fn w_val<'a>(node: &Node<'a, '_>) -> Option<&'a str> {
    node.attribute((W_NS, "val"))
}

fn is_unsupported(node: &Node) -> bool {
    UNSUPPORTED.iter().any(|(tag, _)| is_w(node, tag))
}

/// Paragraphs of the body in document order, table cells included.
/// Paragraphs nested in drawings (text boxes) are not part of the flow.
fn body_paragraphs<'a, 'input>(doc: &'a Document<'input>) -> Vec<Node<'a, 'input>> {
    doc.descendants()
        .filter(|n| is_w(n, "p"))
        .filter(|p| !p.ancestors().skip(1).any(|a| is_unsupported(&a)))
        .collect()
}

fn collect_warnings(doc: &Document) -> Vec<String> {
    UNSUPPORTED
        .iter()
        .filter_map(|(tag, label)| {
            let count = doc.descendants().filter(|n| is_w(n, tag)).count();
            (count > 0).then(|| format!("skipped {count} {label} element(s) (w:{tag})"))
        })
        .collect()
}

fn render_text(bytes: &[u8]) -> Result<(String, Vec<String>), ExtractionError> {
    let package = DocxPackage::open(bytes)?;
    let doc = Document::parse(&package.document)?;

    let mut text = String::new();
    for paragraph in body_paragraphs(&doc) {
        push_run_text(&paragraph, &mut text);
        text.push_str("\n\n");
    }
    Ok((text, collect_warnings(&doc)))
}

/// Text of the runs below `node`, skipping embedded objects and nested paragraphs.
fn push_run_text(node: &Node, out: &mut String) {
    for child in node.children().filter(Node::is_element) {
        if is_w(&child, "t") {
            out.push_str(child.text().unwrap_or_default());
        } else if is_w(&child, "tab") {
            out.push('\t');
        } else if is_w(&child, "br") || is_w(&child, "cr") {
            out.push('\n');
        } else if is_w(&child, "p") || is_unsupported(&child) {
            continue;
        } else {
            push_run_text(&child, out);
        }
    }
}

fn render_html(bytes: &[u8]) -> Result<String, ExtractionError> {
    let package = DocxPackage::open(bytes)?;
    let doc = Document::parse(&package.document)?;
    let links = match &package.relationships {
        Some(xml) => hyperlink_targets(&Document::parse(xml)?),
        None => HashMap::new(),
    };
    let lists = match &package.numbering {
        Some(xml) => ListFormats::parse(&Document::parse(xml)?),
        None => ListFormats::default(),
    };

    let renderer = HtmlRenderer {
        links: &links,
        lists: &lists,
    };
    let mut html = String::new();
    if let Some(body) = doc.root_element().children().find(|c| is_w(c, "body")) {
        renderer.blocks(&body, &mut html);
    }
    Ok(html)
}

fn hyperlink_targets(rels: &Document) -> HashMap<String, String> {
    rels.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter(|n| n.attribute("Type").is_some_and(|t| t.ends_with("/hyperlink")))
        .filter_map(|n| Some((n.attribute("Id")?.to_string(), n.attribute("Target")?.to_string())))
        .collect()
}

/// Ordered/unordered flag per `(numId, ilvl)`.
#[derive(Debug, Default)]
struct ListFormats {
    ordered: HashMap<(String, String), bool>,
}

impl ListFormats {
    fn parse(numbering: &Document) -> Self {
        let root = numbering.root_element();
        let abstract_levels: HashMap<&str, Vec<(String, bool)>> = root
            .children()
            .filter(|n| is_w(n, "abstractNum"))
            .filter_map(|abs| {
                let id = abs.attribute((W_NS, "abstractNumId"))?;
                let levels = abs
                    .children()
                    .filter(|l| is_w(l, "lvl"))
                    .filter_map(|l| {
                        let ilvl = l.attribute((W_NS, "ilvl"))?.to_string();
                        let format = w_child(&l, "numFmt").and_then(|f| w_val(&f)).unwrap_or("bullet");
                        Some((ilvl, format != "bullet"))
                    })
                    .collect();
                Some((id, levels))
            })
            .collect();

        let mut ordered = HashMap::new();
        for num in root.children().filter(|n| is_w(n, "num")) {
            let Some(num_id) = num.attribute((W_NS, "numId")) else {
                continue;
            };
            let Some(levels) = w_child(&num, "abstractNumId")
                .and_then(|a| w_val(&a))
                .and_then(|id| abstract_levels.get(id))
            else {
                continue;
            };
            for (ilvl, is_ordered) in levels {
                ordered.insert((num_id.to_string(), ilvl.clone()), *is_ordered);
            }
        }
        Self { ordered }
    }

    fn is_ordered(&self, num_id: &str, ilvl: &str) -> bool {
        self.ordered
            .get(&(num_id.to_string(), ilvl.to_string()))
            .copied()
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

struct HtmlRenderer<'r> {
    links: &'r HashMap<String, String>,
    lists: &'r ListFormats,
}

impl HtmlRenderer<'_> {
    fn blocks(&self, container: &Node, out: &mut String) {
        let mut open_list: Option<ListKind> = None;
        for child in container.children().filter(Node::is_element) {
            let list = if is_w(&child, "p") { self.list_kind(&child) } else { None };
            if open_list != list {
                if let Some(kind) = open_list {
                    out.push_str(&format!("</{}>", kind.tag()));
                }
                if let Some(kind) = list {
                    out.push_str(&format!("<{}>", kind.tag()));
                }
                open_list = list;
            }

            if is_w(&child, "p") {
                self.paragraph(&child, list.is_some(), out);
            } else if is_w(&child, "tbl") {
                self.table(&child, out);
            } else if is_w(&child, "sdt") {
                if let Some(content) = w_child(&child, "sdtContent") {
                    self.blocks(&content, out);
                }
            }
        }
        if let Some(kind) = open_list {
            out.push_str(&format!("</{}>", kind.tag()));
        }
    }

    fn list_kind(&self, paragraph: &Node) -> Option<ListKind> {
        let num_pr = w_child(paragraph, "pPr").and_then(|p| w_child(&p, "numPr"))?;
        let num_id = w_child(&num_pr, "numId").and_then(|n| w_val(&n))?;
        // numId 0 removes numbering inherited from the style.
        if num_id == "0" {
            return None;
        }
        let ilvl = w_child(&num_pr, "ilvl").and_then(|n| w_val(&n)).unwrap_or("0");
        Some(if self.lists.is_ordered(num_id, ilvl) {
            ListKind::Ordered
        } else {
            ListKind::Unordered
        })
    }

    fn paragraph(&self, paragraph: &Node, in_list: bool, out: &mut String) {
        let mut inline = String::new();
        self.inline(paragraph, &mut inline);
        if inline.trim().is_empty() {
            return;
        }
        let tag = if in_list {
            "li".to_string()
        } else {
            heading_tag(paragraph).unwrap_or_else(|| "p".to_string())
        };
        out.push_str(&format!("<{tag}>{inline}</{tag}>"));
    }

    fn inline(&self, node: &Node, out: &mut String) {
        for child in node.children().filter(Node::is_element) {
            if is_w(&child, "r") {
                run(&child, out);
            } else if is_w(&child, "hyperlink") {
                let mut label = String::new();
                self.inline(&child, &mut label);
                match child.attribute((R_NS, "id")).and_then(|id| self.links.get(id)) {
                    Some(href) => {
                        out.push_str(&format!("<a href=\"{}\">{label}</a>", escape(href)));
                    }
                    None => out.push_str(&label),
                }
            } else if is_w(&child, "ins") || is_w(&child, "smartTag") || is_w(&child, "fldSimple") {
                self.inline(&child, out);
            }
        }
    }

    fn table(&self, table: &Node, out: &mut String) {
        out.push_str("<table>");
        for row in table.children().filter(|n| is_w(n, "tr")) {
            out.push_str("<tr>");
            for cell in row.children().filter(|n| is_w(n, "tc")) {
                out.push_str("<td>");
                self.blocks(&cell, out);
                out.push_str("</td>");
            }
            out.push_str("</tr>");
        }
        out.push_str("</table>");
    }
}

fn heading_tag(paragraph: &Node) -> Option<String> {
    let style = w_child(paragraph, "pPr")
        .and_then(|p| w_child(&p, "pStyle"))
        .and_then(|s| w_val(&s))?;
    if style == "Title" {
        return Some("h1".to_string());
    }
    let level: u8 = style.strip_prefix("Heading")?.parse().ok()?;
    (1..=6).contains(&level).then(|| format!("h{level}"))
}

fn run(run: &Node, out: &mut String) {
    let mut text = String::new();
    for child in run.children().filter(Node::is_element) {
        if is_w(&child, "t") {
            text.push_str(&escape(child.text().unwrap_or_default()));
        } else if is_w(&child, "tab") {
            text.push('\t');
        } else if is_w(&child, "br") || is_w(&child, "cr") {
            text.push_str("<br />");
        }
    }
    if text.is_empty() {
        return;
    }

    let props = w_child(run, "rPr");
    let enabled = |name: &str| {
        props
            .and_then(|p| w_child(&p, name))
            .is_some_and(|flag| !matches!(w_val(&flag), Some("false" | "0" | "off")))
    };

    let mut wrapped = text;
    if enabled("strike") || enabled("dstrike") {
        wrapped = format!("<s>{wrapped}</s>");
    }
    if enabled("i") {
        wrapped = format!("<em>{wrapped}</em>");
    }
    if enabled("b") {
        wrapped = format!("<strong>{wrapped}</strong>");
    }
    out.push_str(&wrapped);
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn docx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, body) in parts {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{body}</w:body></w:document>"#
        )
    }

    const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>
  <w:abstractNum w:abstractNumId="1"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl></w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://docusaurus.io/" TargetMode="External"/>
</Relationships>"#;

    fn sample() -> Vec<u8> {
        let body = r#"
<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Getting started</w:t></w:r></w:p>
<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Install</w:t></w:r><w:r><w:t xml:space="preserve"> the &lt;cli&gt;.</w:t></w:r></w:p>
<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>first</w:t></w:r></w:p>
<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>second</w:t></w:r></w:p>
<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="2"/></w:numPr></w:pPr><w:r><w:t>step one</w:t></w:r></w:p>
<w:p><w:hyperlink r:id="rId7"><w:r><w:t>Docs</w:t></w:r></w:hyperlink></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Value</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:drawing><w:inline/></w:drawing></w:r><w:r><w:rPr><w:i/><w:strike/></w:rPr><w:t>old</w:t></w:r></w:p>
"#;
        docx(&[
            (DOCUMENT_PART, document(body).as_str()),
            (RELATIONSHIPS_PART, RELS),
            (NUMBERING_PART, NUMBERING),
        ])
    }

    #[tokio::test]
    async fn extracts_paragraph_text_including_table_cells() {
        let extracted = DocxExtractor.extract_text(&sample()).await.unwrap();
        assert_eq!(
            extracted.text,
            "Getting started\n\nInstall the <cli>.\n\nfirst\n\nsecond\n\nstep one\n\nDocs\n\nName\n\nValue\n\nold\n\n"
        );
        assert!(extracted.html.is_none());
    }

    #[tokio::test]
    async fn drawings_only_produce_warnings() {
        let extracted = DocxExtractor.extract_text(&sample()).await.unwrap();
        assert_eq!(extracted.warnings.len(), 1);
        assert!(extracted.warnings[0].contains("w:drawing"));
    }

    #[tokio::test]
    async fn renders_headings_lists_links_and_tables_as_html() {
        let extracted = DocxExtractor.extract_text_and_html(&sample()).await.unwrap();
        let html = extracted.html.unwrap();
        assert!(html.starts_with("<h1>Getting started</h1>"));
        assert!(html.contains("<p><strong>Install</strong> the &lt;cli&gt;.</p>"));
        assert!(html.contains("<ul><li>first</li><li>second</li></ul><ol><li>step one</li></ol>"));
        assert!(html.contains("<a href=\"https://docusaurus.io/\">Docs</a>"));
        assert!(html.contains("<table><tr><td><p>Name</p></td><td><p>Value</p></td></tr></table>"));
        assert!(html.contains("<em><s>old</s></em>"));
        assert!(extracted.text.contains("Getting started"));
    }

    #[tokio::test]
    async fn unresolved_hyperlink_keeps_its_label() {
        let bytes = docx(&[(
            DOCUMENT_PART,
            document(r#"<w:p><w:hyperlink r:id="rId99"><w:r><w:t>Label</w:t></w:r></w:hyperlink></w:p>"#)
                .as_str(),
        )]);
        let html = DocxExtractor
            .extract_text_and_html(&bytes)
            .await
            .unwrap()
            .html
            .unwrap();
        assert_eq!(html, "<p>Label</p>");
    }

    #[tokio::test]
    async fn rejects_bytes_that_are_not_a_zip() {
        let err = DocxExtractor
            .extract_text(b"definitely not a docx")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidArchive(_)));
    }

    #[tokio::test]
    async fn rejects_archive_without_document_part() {
        let bytes = docx(&[("word/styles.xml", "<styles/>")]);
        let err = DocxExtractor.extract_text_and_html(&bytes).await.unwrap_err();
        assert!(matches!(err, ExtractionError::MissingPart(DOCUMENT_PART)));
    }

    #[tokio::test]
    async fn rejects_malformed_document_xml() {
        let bytes = docx(&[(DOCUMENT_PART, "<w:document><w:body>")]);
        let err = DocxExtractor.extract_text(&bytes).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Xml(_)));
    }
}
