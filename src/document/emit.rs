//! Canonical YAML emitter
//!
//! Block collections use two-space indentation, trailing comments are
//! separated by a single space, and each node keeps the quoting, tag and
//! comments it was loaded with. Text produced here parses back to the same
//! tree, so emitting is idempotent.

use super::{ConfigDocument, Mapping, Node, Style, Value};

const INDENT: usize = 2;

pub fn emit_document(doc: &ConfigDocument) -> String {
    let mut out = String::new();
    let root = &doc.root;

    push_leading(&mut out, root, 0);
    match &root.value {
        Value::Map(map) if is_block_container(root) => emit_entries(&mut out, map, 0),
        Value::Seq(items) if is_block_container(root) => emit_items(&mut out, items, 0),
        Value::Null if root.tag.is_none() && root.comment.is_none() => {}
        _ => {
            if let Some(literal) = literal_block(root, 0) {
                out.push_str(&literal.header);
                push_trailing(&mut out, root);
                out.push('\n');
                out.push_str(&literal.body);
            } else {
                out.push_str(&inline(root, false));
                push_trailing(&mut out, root);
                out.push('\n');
            }
        }
    }
    push_comment_block(&mut out, &doc.footer, &doc.footer_blank_lines, 0);
    out
}

fn is_block_container(node: &Node) -> bool {
    if node.style == Style::Flow {
        return false;
    }
    match &node.value {
        Value::Map(map) => !map.is_empty(),
        Value::Seq(items) => !items.is_empty(),
        _ => false,
    }
}

fn push_leading(out: &mut String, node: &Node, indent: usize) {
    push_comment_block(out, &node.leading, &node.blank_lines, indent);
}

/// Comment lines with `blank_lines[i]` empty lines before line `i` and
/// `blank_lines[lines.len()]` after the last one
fn push_comment_block(out: &mut String, lines: &[String], blank_lines: &[usize], indent: usize) {
    for (i, line) in lines.iter().enumerate() {
        push_blank_lines(out, blank_lines.get(i).copied().unwrap_or(0));
        out.push_str(&" ".repeat(indent));
        if line.is_empty() {
            out.push('#');
        } else {
            out.push_str("# ");
            out.push_str(line);
        }
        out.push('\n');
    }
    push_blank_lines(out, blank_lines.get(lines.len()).copied().unwrap_or(0));
}

fn push_blank_lines(out: &mut String, count: usize) {
    for _ in 0..count {
        out.push('\n');
    }
}

fn push_trailing(out: &mut String, node: &Node) {
    if let Some(comment) = &node.comment {
        if comment.is_empty() {
            out.push_str(" #");
        } else {
            out.push_str(" # ");
            out.push_str(comment);
        }
    }
}

fn emit_entries(out: &mut String, map: &Mapping, indent: usize) {
    let pad = " ".repeat(indent);
    for (key, node) in map.iter() {
        push_leading(out, node, indent);
        out.push_str(&pad);
        out.push_str(&format_key(key));
        out.push(':');

        if is_block_container(node) {
            if let Some(tag) = &node.tag {
                out.push(' ');
                out.push_str(tag.as_str());
            }
            push_trailing(out, node);
            out.push('\n');
            emit_children(out, node, indent + INDENT);
        } else if let Some(literal) = literal_block(node, indent + INDENT) {
            out.push(' ');
            out.push_str(&literal.header);
            push_trailing(out, node);
            out.push('\n');
            out.push_str(&literal.body);
        } else {
            let text = inline(node, false);
            if !text.is_empty() {
                out.push(' ');
                out.push_str(&text);
            }
            push_trailing(out, node);
            out.push('\n');
        }
    }
}

fn emit_items(out: &mut String, items: &[Node], indent: usize) {
    let pad = " ".repeat(indent);
    for node in items {
        push_leading(out, node, indent);

        if is_block_container(node) {
            if node.comment.is_none() && node.tag.is_none() && !first_child_has_leading(node) {
                // `- key: value` with the rest of the collection aligned under it
                let mut nested = String::new();
                emit_children(&mut nested, node, indent + INDENT);
                nested.replace_range(indent..indent + INDENT, "- ");
                out.push_str(&nested);
            } else {
                out.push_str(&pad);
                out.push('-');
                if let Some(tag) = &node.tag {
                    out.push(' ');
                    out.push_str(tag.as_str());
                }
                push_trailing(out, node);
                out.push('\n');
                emit_children(out, node, indent + INDENT);
            }
        } else if let Some(literal) = literal_block(node, indent + INDENT) {
            out.push_str(&pad);
            out.push_str("- ");
            out.push_str(&literal.header);
            push_trailing(out, node);
            out.push('\n');
            out.push_str(&literal.body);
        } else {
            out.push_str(&pad);
            out.push('-');
            let text = inline(node, false);
            if !text.is_empty() {
                out.push(' ');
                out.push_str(&text);
            }
            push_trailing(out, node);
            out.push('\n');
        }
    }
}

fn emit_children(out: &mut String, node: &Node, indent: usize) {
    match &node.value {
        Value::Map(map) => emit_entries(out, map, indent),
        Value::Seq(items) => emit_items(out, items, indent),
        _ => {}
    }
}

fn first_child_has_leading(node: &Node) -> bool {
    match &node.value {
        Value::Map(map) => map.iter().next().map(|(_, v)| v.has_leading_lines()).unwrap_or(false),
        Value::Seq(items) => items.first().map(|v| v.has_leading_lines()).unwrap_or(false),
        _ => false,
    }
}

struct LiteralBlock {
    header: String,
    body: String,
}

/// `|` block for literal-styled strings that can be written that way
fn literal_block(node: &Node, indent: usize) -> Option<LiteralBlock> {
    let text = match (&node.style, &node.value) {
        (Style::Literal, Value::Str(s)) => s,
        _ => return None,
    };
    if text.is_empty()
        || text.ends_with("\n\n")
        || text.starts_with(' ')
        || text.starts_with('\n')
        || text.chars().any(|c| c.is_control() && c != '\n')
    {
        return None;
    }

    let (chomp, content) = match text.strip_suffix('\n') {
        Some(content) => ("", content),
        None => ("-", text.as_str()),
    };
    let mut header = String::new();
    if let Some(tag) = &node.tag {
        header.push_str(tag.as_str());
        header.push(' ');
    }
    header.push('|');
    header.push_str(chomp);

    let pad = " ".repeat(indent);
    let mut body = String::new();
    for line in content.split('\n') {
        if !line.is_empty() {
            body.push_str(&pad);
            body.push_str(line);
        }
        body.push('\n');
    }
    Some(LiteralBlock { header, body })
}

/// Single-line rendering of a scalar or flow collection
fn inline(node: &Node, in_flow: bool) -> String {
    let tag = node.tag.as_ref().map(|t| t.as_str());
    let body = match &node.value {
        Value::Null => {
            if in_flow || tag.is_some() {
                "null".to_string()
            } else {
                String::new()
            }
        }
        Value::Bool(b) => quote_if_tagged(node, b.to_string()),
        Value::Int(i) => quote_if_tagged(node, format_int(*i, node.style)),
        Value::Float(f) => quote_if_tagged(node, format_float(*f)),
        Value::Str(s) => format_str(s, node.style, in_flow),
        Value::Seq(items) => {
            let parts: Vec<String> = items.iter().map(|n| inline(n, true)).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Map(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", format_flow_key(k), inline(v, true)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    };
    match tag {
        Some(tag) => format!("{} {}", tag, body),
        None => body,
    }
}

/// `!!int "5"` keeps its quotes; untagged scalars never need them
fn quote_if_tagged(node: &Node, text: String) -> String {
    if node.tag.is_none() {
        return text;
    }
    match node.style {
        Style::DoubleQuoted => double_quote(&text),
        Style::SingleQuoted => single_quote(&text),
        _ => text,
    }
}

fn format_int(value: i64, style: Style) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    match style {
        Style::Hex => format!("{}0x{:x}", sign, magnitude),
        Style::Octal => format!("{}0o{:o}", sign, magnitude),
        _ => value.to_string(),
    }
}

/// Float text that reads back as a float
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return ".nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    let mut text = value.to_string();
    if !text.contains(['.', 'e', 'E']) {
        text.push_str(".0");
    }
    text
}

fn format_str(text: &str, style: Style, in_flow: bool) -> String {
    match style {
        Style::DoubleQuoted => double_quote(text),
        Style::SingleQuoted if !text.contains('\n') && !text.chars().any(|c| c.is_control()) => {
            single_quote(text)
        }
        Style::SingleQuoted => double_quote(text),
        _ if needs_quotes(text, in_flow) => double_quote(text),
        _ => text.to_string(),
    }
}

fn format_key(key: &str) -> String {
    if key.is_empty() || is_unsafe_plain(key, false) {
        double_quote(key)
    } else {
        key.to_string()
    }
}

fn format_flow_key(key: &str) -> String {
    if key.is_empty() || is_unsafe_plain(key, true) {
        double_quote(key)
    } else {
        key.to_string()
    }
}

/// Plain text that would load back as something other than this string
fn needs_quotes(text: &str, in_flow: bool) -> bool {
    text.is_empty() || looks_like_scalar(text) || is_unsafe_plain(text, in_flow)
}

fn looks_like_scalar(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "null" | "~" | "true" | "false" | "yes" | "no" | "on" | "off" | "y" | "n"
            | ".inf" | "-.inf" | "+.inf" | ".nan"
    ) {
        return true;
    }
    let numeric = lower.trim_start_matches(['-', '+']);
    numeric.starts_with("0x")
        || numeric.starts_with("0o")
        || (numeric.starts_with(|c: char| c.is_ascii_digit() || c == '.')
            && lower.replace('_', "").parse::<f64>().is_ok())
}

fn is_unsafe_plain(text: &str, in_flow: bool) -> bool {
    let first = match text.chars().next() {
        Some(c) => c,
        None => return true,
    };
    if text != text.trim() {
        return true;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return true;
    }
    if text.contains(": ") || text.contains(" #") || text.ends_with(':') {
        return true;
    }
    if text.chars().any(|c| c.is_control()) {
        return true;
    }
    in_flow && text.contains([',', '[', ']', '{', '}'])
}

fn double_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Tag;

    fn round_trip(source: &str) -> String {
        ConfigDocument::parse(source).unwrap().to_yaml_string()
    }

    #[test]
    fn test_canonical_round_trip_is_exact() {
        let source = "\
# bot settings
bot:
  name: Eridanus # shown in chat
  master: 123456
  token: \"abc\"
  ratio: 0.5
  enabled: true
  proxy:
plugins:
  - name: weather
    key: 'k1'
  - name: music
ids:
  - 1
  - 2
tags: [a, b]
empty: {}
prompt: |
  hello
  world
# end
";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_emit_is_idempotent_for_loose_input() {
        let source = "a:   1    #  spaced\nb:\n    - x\n    -   y\n#tail";
        let once = round_trip(source);
        assert_eq!(round_trip(&once), once);
        assert_eq!(once, "a: 1 # spaced\nb:\n  - x\n  - y\n# tail\n");
    }

    #[test]
    fn test_blank_lines_between_sections_survive() {
        let source = "\
# plugin settings

a: 1

# section two
b:
  x: 1

  y: 2

list:
  - 1

  - 2
c: 3

# end
";
        assert_eq!(round_trip(source), source);
        assert_eq!(round_trip("a: 1\n\n# section two\nb: 2\n"), "a: 1\n\n# section two\nb: 2\n");
    }

    #[test]
    fn test_trailing_blank_lines_are_dropped() {
        assert_eq!(round_trip("a: 1\n\n\n"), "a: 1\n");
    }

    #[test]
    fn test_emit_quotes_ambiguous_strings() {
        let mut map = Mapping::new();
        map.insert("a", Node::new(Value::Str("123".into())));
        map.insert("b", Node::new(Value::Str("true".into())));
        map.insert("c", Node::new(Value::Str("x: y".into())));
        map.insert("d", Node::new(Value::Str("".into())));
        map.insert("e", Node::new(Value::Str("two\nlines".into())));
        let doc = ConfigDocument::new(Node::new(Value::Map(map)));
        assert_eq!(
            doc.to_yaml_string(),
            "a: \"123\"\nb: \"true\"\nc: \"x: y\"\nd: \"\"\ne: \"two\\nlines\"\n"
        );
    }

    #[test]
    fn test_emit_tagged_int_keeps_quotes() {
        let mut map = Mapping::new();
        map.insert(
            "port",
            Node::new(Value::Int(5)).with_style(Style::DoubleQuoted).with_tag(Tag::Int),
        );
        let doc = ConfigDocument::new(Node::new(Value::Map(map)));
        assert_eq!(doc.to_yaml_string(), "port: !!int \"5\"\n");
    }

    #[test]
    fn test_emit_seq_item_with_comment_is_expanded() {
        let source = "list:\n  - # first\n    a: 1\n    b: 2\n";
        assert_eq!(round_trip(source), source);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(f64::NEG_INFINITY), "-.inf");
    }

    #[test]
    fn test_format_int_styles() {
        assert_eq!(format_int(31, Style::Hex), "0x1f");
        assert_eq!(format_int(-8, Style::Octal), "-0o10");
        assert_eq!(format_int(7, Style::Plain), "7");
    }
}
