//! YAML loader built on the tree-sitter YAML grammar
//!
//! The concrete syntax tree keeps every comment and the exact scalar
//! spelling, which is what lets the loader record quoting, tags and
//! comment placement on each [`Node`].

use std::collections::HashMap;

use tree_sitter::{Language, Node as TsNode, Parser};

use super::{ConfigDocument, Mapping, Node, Style, Tag, Value};
use crate::error::{PanelError, Result};

/// Parse YAML source into a [`ConfigDocument`]. Only the first document of
/// a multi-document stream is loaded.
pub fn parse_document(source: &str) -> Result<ConfigDocument> {
    let language: Language = tree_sitter_yaml::language().into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| PanelError::ParseFailure {
            message: format!("failed to load YAML grammar: {}", e),
        })?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| PanelError::ParseFailure {
            message: "parser returned no tree".to_string(),
        })?;
    let root = tree.root_node();

    if root.has_error() {
        let (row, col) = first_error_position(&root);
        return Err(PanelError::ParseFailure {
            message: format!("malformed YAML at line {}, column {}", row + 1, col + 1),
        });
    }

    let mut loader = Loader::new(source, &root);
    let content = content_of_stream(&root);
    let node = match content {
        Some(content) => {
            let node = loader.load(content)?;
            // block collections are consumed entry by entry
            if block_collection_row(&content).is_none() {
                loader.mark_consumed(&content);
            }
            node
        }
        None => Node::null(),
    };

    let mut doc = ConfigDocument::new(node);
    let (footer, footer_blank_lines) = loader.take_remaining();
    doc.footer = footer;
    doc.footer_blank_lines = footer_blank_lines;
    Ok(doc)
}

fn first_error_position(node: &TsNode) -> (usize, usize) {
    let mut found = None;
    visit_all(node, |n| {
        if found.is_none() && (n.is_error() || n.is_missing()) {
            let pos = n.start_position();
            found = Some((pos.row, pos.column));
        }
    });
    found.unwrap_or((0, 0))
}

/// Visit all nodes in a tree (iterative to avoid stack overflow)
fn visit_all<'t, F>(node: &TsNode<'t>, mut visitor: F)
where
    F: FnMut(&TsNode<'t>),
{
    let mut cursor = node.walk();
    let mut did_visit_children = false;

    loop {
        if !did_visit_children {
            visitor(&cursor.node());
            if cursor.goto_first_child() {
                continue;
            }
        }
        if cursor.goto_next_sibling() {
            did_visit_children = false;
            continue;
        }
        if !cursor.goto_parent() {
            break;
        }
        did_visit_children = true;
    }
}

fn content_of_stream<'t>(root: &TsNode<'t>) -> Option<TsNode<'t>> {
    let document = if root.kind() == "document" {
        Some(*root)
    } else {
        named_children(root)
            .into_iter()
            .find(|n| n.kind() == "document")
    }?;
    named_children(&document)
        .into_iter()
        .find(|n| n.kind() != "comment")
}

fn named_children<'t>(node: &TsNode<'t>) -> Vec<TsNode<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

#[derive(Debug)]
struct Comment {
    row: usize,
    text: String,
}

/// Text of a comment node without the `#` marker
fn comment_text(raw: &str) -> String {
    raw.trim_start_matches('#').trim().to_string()
}

/// Comments and blank-line counts found above a node
struct Leading {
    comments: Vec<String>,
    blank_lines: Vec<usize>,
}

struct Loader<'s> {
    source: &'s str,
    comments: Vec<Comment>,
    next_comment: usize,
    /// `blank[row]` is true for whitespace-only source lines
    blank: Vec<bool>,
    /// First row not yet accounted to any node
    next_row: usize,
    anchors: HashMap<String, Node>,
}

impl<'s> Loader<'s> {
    fn new(source: &'s str, root: &TsNode) -> Self {
        let mut comments = Vec::new();
        visit_all(root, |n| {
            if n.kind() == "comment" {
                comments.push(Comment {
                    row: n.start_position().row,
                    text: comment_text(n.utf8_text(source.as_bytes()).unwrap_or("")),
                });
            }
        });
        comments.sort_by_key(|c| c.row);
        Self {
            source,
            comments,
            next_comment: 0,
            blank: source.lines().map(|line| line.trim().is_empty()).collect(),
            next_row: 0,
            anchors: HashMap::new(),
        }
    }

    fn text(&self, node: &TsNode) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn blank_rows(&self, from: usize, to: usize) -> usize {
        (from..to)
            .filter(|&r| self.blank.get(r).copied().unwrap_or(false))
            .count()
    }

    /// Full-line comments above `row` that no earlier node claimed, with
    /// the blank lines around them
    fn take_leading(&mut self, row: usize) -> Leading {
        let mut comments = Vec::new();
        let mut blank_lines = Vec::new();
        let mut cursor = self.next_row;
        while let Some(c) = self.comments.get(self.next_comment) {
            if c.row >= row {
                break;
            }
            blank_lines.push(self.blank_rows(cursor, c.row));
            cursor = cursor.max(c.row + 1);
            comments.push(c.text.clone());
            self.next_comment += 1;
        }
        blank_lines.push(self.blank_rows(cursor, row));
        self.next_row = self.next_row.max(row);
        if blank_lines.iter().all(|&n| n == 0) {
            blank_lines.clear();
        }
        Leading {
            comments,
            blank_lines,
        }
    }

    /// Rows up to the last line of `node` belong to it
    fn mark_consumed(&mut self, node: &TsNode) {
        let start = node.start_position();
        let end = node.end_position();
        let last = if end.column == 0 && end.row > start.row {
            end.row - 1
        } else {
            end.row
        };
        self.next_row = self.next_row.max(last + 1);
    }

    /// Comment sharing `row` with a node
    fn take_trailing(&mut self, row: usize) -> Option<String> {
        match self.comments.get(self.next_comment) {
            Some(c) if c.row == row => {
                let text = c.text.clone();
                self.next_comment += 1;
                Some(text)
            }
            _ => None,
        }
    }

    /// Unclaimed comments after the last node. Blank lines after the final
    /// comment are not kept.
    fn take_remaining(&mut self) -> (Vec<String>, Vec<usize>) {
        let mut comments = Vec::new();
        let mut blank_lines = Vec::new();
        let mut cursor = self.next_row;
        for c in &self.comments[self.next_comment..] {
            blank_lines.push(self.blank_rows(cursor, c.row));
            cursor = cursor.max(c.row + 1);
            comments.push(c.text.clone());
        }
        self.next_comment = self.comments.len();
        if blank_lines.iter().all(|&n| n == 0) {
            blank_lines.clear();
        }
        (comments, blank_lines)
    }

    /// Load a `block_node` / `flow_node` wrapper or a bare content node
    fn load(&mut self, node: TsNode) -> Result<Node> {
        let (tag, anchor, content) = match node.kind() {
            "block_node" | "flow_node" => {
                let mut tag = None;
                let mut anchor = None;
                let mut content = None;
                for child in named_children(&node) {
                    match child.kind() {
                        "tag" => tag = Some(Tag::parse(self.text(&child))),
                        "anchor" => {
                            anchor = Some(self.text(&child).trim_start_matches('&').to_string())
                        }
                        "comment" => {}
                        _ if content.is_none() => content = Some(child),
                        _ => {}
                    }
                }
                (tag, anchor, content)
            }
            _ => (None, None, Some(node)),
        };

        let mut loaded = match content {
            Some(content) => self.load_content(content)?,
            None => Node::null(),
        };

        if let Some(tag) = tag {
            apply_tag(&mut loaded, tag);
        }
        if let Some(name) = anchor {
            self.anchors.insert(name, loaded.without_comments());
        }
        Ok(loaded)
    }

    fn load_content(&mut self, node: TsNode) -> Result<Node> {
        match node.kind() {
            "block_mapping" => self.load_block_mapping(node),
            "block_sequence" => self.load_block_sequence(node),
            "flow_mapping" => self.load_flow_mapping(node),
            "flow_sequence" => self.load_flow_sequence(node),
            "block_scalar" => Ok(self.load_block_scalar(node)),
            "plain_scalar" => Ok(self.load_plain_scalar(node)),
            "double_quote_scalar" => Ok(Node::new(Value::Str(decode_double_quoted(self.text(&node))))
                .with_style(Style::DoubleQuoted)),
            "single_quote_scalar" => Ok(Node::new(Value::Str(decode_single_quoted(self.text(&node))))
                .with_style(Style::SingleQuoted)),
            "alias" => {
                let name = self.text(&node).trim_start_matches('*');
                self.anchors
                    .get(name)
                    .cloned()
                    .ok_or_else(|| PanelError::ParseFailure {
                        message: format!(
                            "unknown alias *{} at line {}",
                            name,
                            node.start_position().row + 1
                        ),
                    })
            }
            "block_node" | "flow_node" => self.load(node),
            other => Err(PanelError::ParseFailure {
                message: format!(
                    "unsupported YAML construct '{}' at line {}",
                    other,
                    node.start_position().row + 1
                ),
            }),
        }
    }

    fn load_block_mapping(&mut self, node: TsNode) -> Result<Node> {
        let mut map = Mapping::new();
        for pair in named_children(&node) {
            if pair.kind() != "block_mapping_pair" {
                continue;
            }
            let row = pair.start_position().row;
            let leading = self.take_leading(row);
            let trailing = self.take_trailing(row);

            let key = match pair.child_by_field_name("key") {
                Some(key) => self.key_text(key)?,
                None => {
                    return Err(PanelError::ParseFailure {
                        message: format!("mapping entry without key at line {}", row + 1),
                    })
                }
            };
            let mut value = match pair.child_by_field_name("value") {
                Some(value) => self.load(value)?,
                None => Node::null(),
            };
            self.mark_consumed(&pair);
            value.leading = leading.comments;
            value.blank_lines = leading.blank_lines;
            if trailing.is_some() {
                value.comment = trailing;
            }
            map.insert(key, value);
        }
        Ok(Node::new(Value::Map(map)))
    }

    fn load_block_sequence(&mut self, node: TsNode) -> Result<Node> {
        let mut items = Vec::new();
        for item in named_children(&node) {
            if item.kind() != "block_sequence_item" {
                continue;
            }
            let row = item.start_position().row;
            let leading = self.take_leading(row);
            let content = named_children(&item)
                .into_iter()
                .find(|n| n.kind() != "comment");

            // `- a: 1 # c` belongs to the entry `a`, not to the item
            let inline_block = content
                .and_then(|c| block_collection_row(&c))
                .map(|start| start == row)
                .unwrap_or(false);
            let trailing = if inline_block {
                None
            } else {
                self.take_trailing(row)
            };

            let mut value = match content {
                Some(content) => self.load(content)?,
                None => Node::null(),
            };
            self.mark_consumed(&item);
            value.leading = leading.comments;
            value.blank_lines = leading.blank_lines;
            if trailing.is_some() {
                value.comment = trailing;
            }
            items.push(value);
        }
        Ok(Node::new(Value::Seq(items)))
    }

    fn load_flow_mapping(&mut self, node: TsNode) -> Result<Node> {
        let mut map = Mapping::new();
        for child in named_children(&node) {
            match child.kind() {
                "flow_pair" => {
                    let key = match child.child_by_field_name("key") {
                        Some(key) => self.key_text(key)?,
                        None => String::new(),
                    };
                    let value = match child.child_by_field_name("value") {
                        Some(value) => self.load(value)?,
                        None => Node::null(),
                    };
                    map.insert(key, value);
                }
                "flow_node" => {
                    let key = self.key_text(child)?;
                    map.insert(key, Node::null());
                }
                _ => {}
            }
        }
        Ok(Node::new(Value::Map(map)).with_style(Style::Flow))
    }

    fn load_flow_sequence(&mut self, node: TsNode) -> Result<Node> {
        let mut items = Vec::new();
        for child in named_children(&node) {
            match child.kind() {
                "flow_node" => items.push(self.load(child)?),
                "flow_pair" => {
                    let mut single = Mapping::new();
                    let key = match child.child_by_field_name("key") {
                        Some(key) => self.key_text(key)?,
                        None => String::new(),
                    };
                    let value = match child.child_by_field_name("value") {
                        Some(value) => self.load(value)?,
                        None => Node::null(),
                    };
                    single.insert(key, value);
                    items.push(Node::new(Value::Map(single)).with_style(Style::Flow));
                }
                _ => {}
            }
        }
        Ok(Node::new(Value::Seq(items)).with_style(Style::Flow))
    }

    fn key_text(&mut self, node: TsNode) -> Result<String> {
        let key = self.load(node)?;
        match key.value {
            Value::Str(s) => Ok(s),
            Value::Null => Ok(self.text(&node).trim().to_string()),
            Value::Seq(_) | Value::Map(_) => Err(PanelError::ParseFailure {
                message: format!(
                    "complex mapping key at line {}",
                    node.start_position().row + 1
                ),
            }),
            _ => Ok(strip_tag_prefix(self.text(&node)).to_string()),
        }
    }

    fn load_plain_scalar(&mut self, node: TsNode) -> Node {
        let raw = self.text(&node);
        let text = fold_plain(raw);
        let kind = named_children(&node)
            .first()
            .map(|n| n.kind())
            .unwrap_or("string_scalar");

        match kind {
            "integer_scalar" => decode_integer(&text)
                .unwrap_or_else(|| Node::new(Value::Str(text.clone()))),
            "float_scalar" => match decode_float(&text) {
                Some(f) => Node::new(Value::Float(f)),
                None => Node::new(Value::Str(text)),
            },
            "boolean_scalar" => Node::new(Value::Bool(text.eq_ignore_ascii_case("true"))),
            "null_scalar" => Node::null(),
            _ => Node::new(Value::Str(text)),
        }
    }

    fn load_block_scalar(&mut self, node: TsNode) -> Node {
        Node::new(Value::Str(decode_block_scalar(self.text(&node)))).with_style(Style::Literal)
    }
}

/// Row where a block collection begins, looking through a `block_node` wrapper
fn block_collection_row(node: &TsNode) -> Option<usize> {
    match node.kind() {
        "block_mapping" | "block_sequence" => Some(node.start_position().row),
        "block_node" => named_children(node)
            .iter()
            .find(|c| matches!(c.kind(), "block_mapping" | "block_sequence"))
            .map(|c| c.start_position().row),
        _ => None,
    }
}

fn strip_tag_prefix(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with('!') {
        match text.split_once(char::is_whitespace) {
            Some((_, rest)) => rest.trim(),
            None => text,
        }
    } else {
        text
    }
}

/// Re-type a loaded node according to its explicit tag
fn apply_tag(node: &mut Node, tag: Tag) {
    let retyped = match (&tag, &node.value) {
        (Tag::Str, value) => value.coerce_to_string().map(Value::Str),
        (Tag::Int, value) => value.coerce_to_int().map(Value::Int),
        (Tag::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        (Tag::Float, Value::Str(s)) => decode_float(s.trim()).map(Value::Float),
        (Tag::Bool, Value::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (Tag::Null, _) => Some(Value::Null),
        _ => None,
    };
    if let Some(value) = retyped {
        node.value = value;
    }
    if matches!(node.style, Style::Hex | Style::Octal) && !matches!(node.value, Value::Int(_)) {
        node.style = Style::Plain;
    }
    node.tag = Some(tag);
}

/// Multi-line plain scalars fold into one line
fn fold_plain(raw: &str) -> String {
    let mut out = String::new();
    let mut pending_breaks = 0;
    for (i, line) in raw.lines().enumerate() {
        let line = line.trim();
        if i == 0 {
            out.push_str(line);
            continue;
        }
        if line.is_empty() {
            pending_breaks += 1;
            continue;
        }
        if pending_breaks > 0 {
            out.push_str(&"\n".repeat(pending_breaks));
            pending_breaks = 0;
        } else {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

fn decode_integer(text: &str) -> Option<Node> {
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let body = body.replace('_', "");
    let (radix, digits, style) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (16, hex.to_string(), Style::Hex)
    } else if let Some(oct) = body.strip_prefix("0o").or_else(|| body.strip_prefix("0O")) {
        (8, oct.to_string(), Style::Octal)
    } else {
        (10, body, Style::Plain)
    };
    let magnitude = i64::from_str_radix(&digits, radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    Some(Node::new(Value::Int(value)).with_style(style))
}

fn decode_float(text: &str) -> Option<f64> {
    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        ".inf" | "+.inf" => Some(f64::INFINITY),
        "-.inf" => Some(f64::NEG_INFINITY),
        ".nan" => Some(f64::NAN),
        _ => lower.replace('_', "").parse().ok(),
    }
}

/// Fold the line breaks of a quoted scalar body
fn fold_quoted_lines(inner: &str) -> String {
    if !inner.contains('\n') {
        return inner.to_string();
    }
    let lines: Vec<&str> = inner.split('\n').collect();
    let last = lines.len() - 1;
    let mut out = String::new();
    let mut pending_breaks = 0;
    for (i, line) in lines.iter().enumerate() {
        let mut line: &str = line;
        if i > 0 {
            line = line.trim_start();
        }
        if i < last {
            line = line.trim_end();
        }
        if i > 0 {
            if line.is_empty() && i < last {
                pending_breaks += 1;
                continue;
            }
            if pending_breaks > 0 {
                out.push_str(&"\n".repeat(pending_breaks));
                pending_breaks = 0;
            } else {
                out.push(' ');
            }
        }
        out.push_str(line);
    }
    out
}

fn decode_single_quoted(raw: &str) -> String {
    let inner = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);
    fold_quoted_lines(inner).replace("''", "'")
}

fn decode_double_quoted(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    let folded = fold_quoted_lines(inner);

    let mut out = String::with_capacity(folded.len());
    let mut chars = folded.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') | Some('\t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('e') => out.push('\u{1b}'),
            Some('f') => out.push('\u{0c}'),
            Some('v') => out.push('\u{0b}'),
            Some('N') => out.push('\u{85}'),
            Some('_') => out.push('\u{a0}'),
            Some('L') => out.push('\u{2028}'),
            Some('P') => out.push('\u{2029}'),
            Some('x') => push_hex_escape(&mut out, &mut chars, 2),
            Some('u') => push_hex_escape(&mut out, &mut chars, 4),
            Some('U') => push_hex_escape(&mut out, &mut chars, 8),
            Some(' ') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn push_hex_escape(out: &mut String, chars: &mut std::str::Chars, len: usize) {
    let hex: String = chars.by_ref().take(len).collect();
    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push('\\');
            out.push_str(&hex);
        }
    }
}

/// Decode a `|` or `>` block scalar including its header line
fn decode_block_scalar(raw: &str) -> String {
    let (header, body) = raw.split_once('\n').unwrap_or((raw, ""));
    let header = header.split('#').next().unwrap_or("").trim();
    let folded = header.starts_with('>');
    let chomp = if header.contains('-') {
        '-'
    } else if header.contains('+') {
        '+'
    } else {
        ' '
    };

    let lines: Vec<&str> = body.lines().collect();
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    let lines: Vec<&str> = lines
        .iter()
        .map(|l| if l.len() >= indent { &l[indent..] } else { l.trim_start() })
        .collect();

    let mut text = if folded {
        let mut out = String::new();
        let mut prev_plain = false;
        for line in &lines {
            if line.is_empty() {
                out.push('\n');
                prev_plain = false;
            } else if line.starts_with(' ') {
                if prev_plain {
                    out.push('\n');
                }
                out.push_str(line);
                out.push('\n');
                prev_plain = false;
            } else {
                if prev_plain {
                    out.push(' ');
                }
                out.push_str(line);
                prev_plain = true;
            }
        }
        out
    } else {
        lines.join("\n")
    };

    let content_len = text.trim_end_matches('\n').len();
    match chomp {
        '-' => text.truncate(content_len),
        '+' => {
            if !text.ends_with('\n') {
                text.push('\n');
            }
        }
        _ => {
            text.truncate(content_len);
            if !text.is_empty() {
                text.push('\n');
            }
        }
    }
    text
}
