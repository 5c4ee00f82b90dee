//! Indentation outline format.
//!
//! ```text
//! mindmap
//!   school((Lincoln High))
//!     Teachers
//!       smith[Mrs Smith]
//!     Subjects
//! ```
//!
//! A line nested deeper than the line above it becomes that line's child;
//! otherwise it closes open nodes until it finds one with a smaller indent.

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::TreeDocument;

static INIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%%\{\s*init\s*:\s*(\{.*\})\s*\}%%").unwrap());
static CLASS_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*:::\s*[\w\s-]*$").unwrap());
static ICON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^::icon\(.*\)$").unwrap());

#[derive(Debug, Default)]
pub struct ParsedOutline {
    pub document: TreeDocument,
    pub init_config: Option<serde_json::Value>,
}

struct PendingNode {
    doc: TreeDocument,
    indent: usize,
    children: Vec<usize>,
}

pub fn parse_outline(input: &str) -> Result<ParsedOutline> {
    let mut init_config = None;
    let mut flat: Vec<PendingNode> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    for (line_no, raw_line) in input.lines().enumerate() {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(caps) = INIT_RE.captures(trimmed) {
            if let Some(json_str) = caps.get(1).map(|m| m.as_str()) {
                init_config = Some(parse_init(json_str)?);
            }
            continue;
        }
        if trimmed.starts_with("%%") || ICON_RE.is_match(trimmed) {
            continue;
        }
        if flat.is_empty() && trimmed.eq_ignore_ascii_case("mindmap") {
            continue;
        }

        let without_comment = strip_trailing_comment(raw_line);
        let token = CLASS_SUFFIX_RE.replace(without_comment.trim(), "");
        if token.trim().is_empty() {
            continue;
        }
        let doc = parse_node_token(&token);
        let indent = count_indent(raw_line);

        while let Some(&top) = open.last() {
            if flat[top].indent >= indent {
                open.pop();
            } else {
                break;
            }
        }
        let parent = open.last().copied();
        if parent.is_none() && !flat.is_empty() {
            bail!(
                "line {}: `{}` is a second top-level node; a mind map has exactly one root",
                line_no + 1,
                doc.label
            );
        }

        let idx = flat.len();
        flat.push(PendingNode {
            doc,
            indent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            flat[parent].children.push(idx);
        }
        open.push(idx);
    }

    if flat.is_empty() {
        bail!("no mind map nodes found");
    }

    // Children are always created after their parent, so building from the
    // back finishes every child before it is needed.
    let mut built: Vec<Option<TreeDocument>> = vec![None; flat.len()];
    for idx in (0..flat.len()).rev() {
        let pending = &flat[idx];
        let mut doc = pending.doc.clone();
        doc.children = pending
            .children
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        built[idx] = Some(doc);
    }
    let document = built[0].take().unwrap_or_default();

    Ok(ParsedOutline {
        document,
        init_config,
    })
}

fn parse_init(json_str: &str) -> Result<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) {
        return Ok(value);
    }
    json5::from_str::<serde_json::Value>(json_str)
        .map_err(|err| anyhow::anyhow!("invalid init directive: {err}"))
}

/// Splits `id[Label]`, `id(Label)`, `id((Label))`, `id{{Label}}` or a bare
/// label into a document node.
fn parse_node_token(token: &str) -> TreeDocument {
    let trimmed = token.trim();
    let shape_start = trimmed.find(['[', '(', '{']).unwrap_or(0);
    if shape_start > 0 && !trimmed[..shape_start].contains(' ') {
        if let Some(label) = strip_shape(&trimmed[shape_start..]) {
            return TreeDocument::new(label).with_id(trimmed[..shape_start].trim());
        }
    } else if let Some(label) = strip_shape(trimmed) {
        return TreeDocument::new(label);
    }
    TreeDocument::new(strip_quotes(trimmed))
}

fn strip_shape(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    for (open, close) in [("((", "))"), ("{{", "}}"), ("[", "]"), ("(", ")")] {
        if trimmed.len() >= open.len() + close.len()
            && trimmed.starts_with(open)
            && trimmed.ends_with(close)
        {
            return Some(strip_quotes(&trimmed[open.len()..trimmed.len() - close.len()]));
        }
    }
    None
}

fn strip_quotes(input: &str) -> String {
    let trimmed = input.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

fn strip_trailing_comment(line: &str) -> &str {
    match line.find("%%") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn count_indent(line: &str) -> usize {
    let mut count = 0;
    for ch in line.chars() {
        match ch {
            ' ' => count += 1,
            '\t' => count += 2,
            _ => break,
        }
    }
    count
}
