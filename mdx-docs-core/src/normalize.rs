//! HTML → GitHub-flavoured Markdown.
//!
//! The input is parsed with `html5ever` into an `RcDom` and written back out
//! as Markdown: ATX headings, fenced code, `**strong**`, `_em_`, `~~strike~~`,
//! `-` bullets, task-list checkboxes, GFM tables, blockquotes and rules.
//! Tags without a Markdown form degrade to their text content.

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use crate::error::NormalizationError;

/// Tags whose content never reaches the output.
const DROPPED: [&str; 6] = ["head", "script", "style", "title", "noscript", "template"];

/// Convert an HTML document or fragment to Markdown.
pub fn html_to_markdown(html: &str) -> Result<String, NormalizationError> {
    let dom = parse_html(html)?;
    let mut out = String::new();
    write_children(&dom.document, &mut out);

    let markdown = tidy(&out);
    debug!(
        html_chars = html.len(),
        markdown_chars = markdown.len(),
        "Normalized HTML to Markdown"
    );
    Ok(markdown)
}

/// Trim trailing whitespace and collapse blank-line runs outside fenced code.
/// Fenced code is kept byte for byte.
fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0;
    for line in raw.lines() {
        let is_fence = line.trim_start().starts_with("```");
        if in_fence {
            if is_fence {
                in_fence = false;
                lines.push(line.trim_end());
            } else {
                lines.push(line);
            }
            continue;
        }
        let line = line.trim_end();
        if is_fence {
            in_fence = true;
            blank_run = 0;
        } else if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

fn parse_html(html: &str) -> Result<RcDom, NormalizationError> {
    let parse_options = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let dom = parse_document(RcDom::default(), parse_options)
        .from_utf8()
        .read_from(&mut html.as_bytes())?;
    Ok(dom)
}

fn tag_name(handle: &Handle) -> Option<&str> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn attr(handle: &Handle, key: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn element_children(handle: &Handle) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|c| tag_name(c).is_some())
        .cloned()
        .collect()
}

fn write_children(handle: &Handle, out: &mut String) {
    for child in handle.children.borrow().iter() {
        write_node(child, out);
    }
}

fn rendered_children(handle: &Handle) -> String {
    let mut inner = String::new();
    write_children(handle, &mut inner);
    inner
}

fn write_node(handle: &Handle, out: &mut String) {
    match &handle.data {
        NodeData::Document => write_children(handle, out),
        NodeData::Text { contents } => out.push_str(&collapse_whitespace(&contents.borrow())),
        NodeData::Element { .. } => write_element(handle, out),
        _ => {}
    }
}

fn write_element(handle: &Handle, out: &mut String) {
    let Some(tag) = tag_name(handle) else {
        return;
    };
    match tag {
        t if DROPPED.contains(&t) => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            let text = single_line(&rendered_children(handle));
            if !text.is_empty() {
                out.push_str(&format!("\n\n{} {text}\n\n", "#".repeat(level)));
            }
        }
        "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "li" => {
            out.push_str(&format!("\n\n{}\n\n", rendered_children(handle).trim()));
        }
        "br" => out.push('\n'),
        "hr" => out.push_str("\n\n---\n\n"),
        "strong" | "b" => wrap_inline(handle, "**", out),
        "em" | "i" => wrap_inline(handle, "_", out),
        "s" | "del" | "strike" => wrap_inline(handle, "~~", out),
        "code" => {
            let code = raw_text(handle);
            let code = code.trim();
            if !code.is_empty() {
                out.push_str(&format!("`{code}`"));
            }
        }
        "a" => {
            let label = rendered_children(handle).trim().to_string();
            match attr(handle, "href") {
                Some(href) if !label.is_empty() => out.push_str(&format!("[{label}]({href})")),
                Some(href) => out.push_str(&format!("<{href}>")),
                None => out.push_str(&label),
            }
        }
        "img" => {
            if let Some(src) = attr(handle, "src") {
                let alt = attr(handle, "alt").unwrap_or_default();
                out.push_str(&format!("![{alt}]({src})"));
            }
        }
        "input" => {
            if attr(handle, "type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) {
                let mark = if attr(handle, "checked").is_some() { "[x]" } else { "[ ]" };
                out.push_str(mark);
            }
        }
        "pre" => write_code_block(handle, out),
        "ul" | "ol" => {
            out.push_str("\n\n");
            out.push_str(&list(handle, tag == "ol", ""));
            out.push_str("\n\n");
        }
        "blockquote" => {
            let inner = rendered_children(handle);
            let quoted: Vec<String> = tidy(&inner)
                .lines()
                .map(|line| match line {
                    "" => ">".to_string(),
                    line => format!("> {line}"),
                })
                .collect();
            out.push_str(&format!("\n\n{}\n\n", quoted.join("\n")));
        }
        "table" => {
            let table = table(handle);
            if !table.is_empty() {
                out.push_str(&format!("\n\n{table}\n\n"));
            }
        }
        _ => write_children(handle, out),
    }
}

fn wrap_inline(handle: &Handle, marker: &str, out: &mut String) {
    let inner = rendered_children(handle);
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        out.push_str(&inner);
        return;
    }
    if inner.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&format!("{marker}{trimmed}{marker}"));
    if inner.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn write_code_block(handle: &Handle, out: &mut String) {
    let language = element_children(handle)
        .iter()
        .find(|c| tag_name(c) == Some("code"))
        .and_then(|code| attr(code, "class"))
        .and_then(|class| {
            class.split_whitespace().find_map(|c| {
                c.strip_prefix("language-")
                    .or_else(|| c.strip_prefix("lang-"))
                    .map(str::to_owned)
            })
        })
        .unwrap_or_default();
    let code = raw_text(handle);
    out.push_str(&format!(
        "\n\n```{language}\n{}\n```\n\n",
        code.trim_end_matches('\n')
    ));
}

/// Render the `li` children of a list, nested lists indented under their item.
fn list(handle: &Handle, ordered: bool, indent: &str) -> String {
    let mut out = String::new();
    let items = element_children(handle)
        .into_iter()
        .filter(|c| tag_name(c) == Some("li"));
    for (index, item) in items.enumerate() {
        let marker = if ordered {
            format!("{}. ", index + 1)
        } else {
            "- ".to_string()
        };
        let child_indent = format!("{indent}{}", " ".repeat(marker.len()));

        let mut content = String::new();
        let mut nested = String::new();
        for child in item.children.borrow().iter() {
            match tag_name(child) {
                Some(t @ ("ul" | "ol")) => nested.push_str(&list(child, t == "ol", &child_indent)),
                _ => write_node(child, &mut content),
            }
        }
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        out.push_str(&format!(
            "{indent}{marker}{}\n{nested}",
            lines.join(&format!("\n{child_indent}"))
        ));
    }
    out
}

fn table(handle: &Handle) -> String {
    let mut rows = Vec::new();
    collect_rows(handle, &mut rows);
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }

    let render_row = |cells: &[String]| {
        let padded: Vec<&str> = (0..width)
            .map(|i| cells.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = vec![render_row(&rows[0])];
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(rows[1..].iter().map(|row| render_row(row)));
    lines.join("\n")
}

/// Rows of `handle`'s own table; nested tables are rendered as cell text.
fn collect_rows(handle: &Handle, rows: &mut Vec<Vec<String>>) {
    for child in element_children(handle) {
        match tag_name(&child) {
            Some("tr") => rows.push(
                element_children(&child)
                    .iter()
                    .filter(|c| matches!(tag_name(c), Some("td" | "th")))
                    .map(|cell| single_line(&rendered_children(cell)).replace('|', "\\|"))
                    .collect(),
            ),
            Some("thead" | "tbody" | "tfoot") => collect_rows(&child, rows),
            _ => {}
        }
    }
}

fn raw_text(handle: &Handle) -> String {
    let mut text = String::new();
    push_raw_text(handle, &mut text);
    text
}

fn push_raw_text(handle: &Handle, out: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } if tag_name(handle) == Some("br") => out.push('\n'),
        _ => {
            for child in handle.children.borrow().iter() {
                push_raw_text(child, out);
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                collapsed.push(' ');
            }
            in_space = true;
        } else {
            collapsed.push(c);
            in_space = false;
        }
    }
    collapsed
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
