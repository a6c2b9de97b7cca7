//! Comment-preserving configuration document model
//!
//! A [`ConfigDocument`] is a tree of [`Node`]s. Each node carries its value
//! together with the facets needed to write the file back the way it was
//! read:
//!
//! - the trailing comment on the node's line and the full-line comments
//!   directly above it
//! - the scalar presentation (quoted, literal block, hex, flow...)
//! - an explicit tag such as `!!int`
//!
//! Mapping key order is the order of [`Mapping`] entries, so there is no
//! separate order table to keep in sync with the tree.
//!
//! # Example
//!
//! ```
//! use eridanus_webui::document::ConfigDocument;
//!
//! let doc = ConfigDocument::parse("port: 5007 # web ui\nname: \"bot\"\n").unwrap();
//! let port = doc.root.get("port").unwrap();
//! assert_eq!(port.comment.as_deref(), Some("web ui"));
//! assert_eq!(doc.to_yaml_string(), "port: 5007 # web ui\nname: \"bot\"\n");
//! ```

pub mod emit;
pub mod json;
pub mod parse;

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{PanelError, Result};
use crate::fs_utils;

pub use json::DocumentSnapshot;

/// Semantic value of a node
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Node>),
    Map(Mapping),
}

/// Type of a value, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Seq,
    Map,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Str => "str",
            Kind::Seq => "seq",
            Kind::Map => "map",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Kind::Seq | Kind::Map)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a node was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    #[default]
    Plain,
    DoubleQuoted,
    SingleQuoted,
    /// `|` / `>` block scalar (always written back as `|`)
    Literal,
    /// `[a, b]` / `{a: 1}`
    Flow,
    /// `0x1f`
    Hex,
    /// `0o17`
    Octal,
}

/// Explicit YAML tag on a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Custom(String),
}

impl Tag {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let name = text
            .strip_prefix("!!")
            .or_else(|| {
                text.strip_prefix("!<tag:yaml.org,2002:")
                    .and_then(|t| t.strip_suffix('>'))
            });
        match name {
            Some("str") => Tag::Str,
            Some("int") => Tag::Int,
            Some("float") => Tag::Float,
            Some("bool") => Tag::Bool,
            Some("null") => Tag::Null,
            _ => Tag::Custom(text.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Tag::Str => "!!str",
            Tag::Int => "!!int",
            Tag::Float => "!!float",
            Tag::Bool => "!!bool",
            Tag::Null => "!!null",
            Tag::Custom(text) => text,
        }
    }
}

/// Ordered string-keyed mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace. Replacing keeps the key's position.
    pub fn insert(&mut self, key: impl Into<String>, node: Node) -> Option<Node> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, node)),
            None => {
                self.entries.push((key, node));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Node)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        let mut map = Mapping::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// One node of the document tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub value: Value,
    pub style: Style,
    pub tag: Option<Tag>,
    /// Comment on the same line as the node (or its key)
    pub comment: Option<String>,
    /// Full-line comments directly above the node
    pub leading: Vec<String>,
    /// Blank lines above the node: entry `i` precedes `leading[i]`, the last
    /// entry sits between the final comment and the node. Empty when none.
    pub blank_lines: Vec<usize>,
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Node {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Node is declared as a string regardless of how its text looks
    pub fn declares_str(&self) -> bool {
        match &self.tag {
            Some(Tag::Str) => true,
            None | Some(Tag::Custom(_)) => {
                matches!(self.style, Style::DoubleQuoted | Style::SingleQuoted)
            }
            Some(_) => false,
        }
    }

    /// Node is declared as a typed integer (`!!int`, hex or octal form)
    pub fn declares_int(&self) -> bool {
        matches!(self.style, Style::Hex | Style::Octal) || self.tag == Some(Tag::Int)
    }

    /// Anything is written on the lines above the node
    pub fn has_leading_lines(&self) -> bool {
        !self.leading.is_empty() || self.blank_lines.iter().any(|&n| n > 0)
    }

    /// Lookup in a mapping node
    pub fn get(&self, key: &str) -> Option<&Node> {
        match &self.value {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        match &mut self.value {
            Value::Map(map) => map.get_mut(key),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match &self.value {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Copy of this node with every comment in the subtree removed
    pub fn without_comments(&self) -> Node {
        let value = match &self.value {
            Value::Seq(items) => Value::Seq(items.iter().map(Node::without_comments).collect()),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.without_comments()))
                    .collect(),
            ),
            other => other.clone(),
        };
        Node {
            value,
            style: self.style,
            tag: self.tag.clone(),
            comment: None,
            leading: Vec::new(),
            blank_lines: Vec::new(),
        }
    }

    /// Equality of values only: presentation and comments are ignored
    pub fn same_value(&self, other: &Node) -> bool {
        self.value.same_as(&other.value)
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::Seq(_) => Kind::Seq,
            Value::Map(_) => Kind::Map,
        }
    }

    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Seq(a), Value::Seq(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_value(vb))
            }
            (a, b) => a == b,
        }
    }

    /// Scalar rendered as text, for coercion into a string-declared slot.
    /// Null and containers do not coerce.
    pub fn coerce_to_string(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(emit::format_float(*f)),
            _ => None,
        }
    }

    /// Scalar read as an integer, for coercion into an int-declared slot
    pub fn coerce_to_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Str(s) => parse_integer_text(s.trim()),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                if *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Parse `-?[0-9]+` into an integer. Anything else is not "numeric-looking".
pub fn parse_integer_text(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Path of a mapping child: `a.b`
pub fn key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Path of a sequence element: `a.b[2]`
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// A loaded configuration document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigDocument {
    pub root: Node,
    /// Comments after the last node
    pub footer: Vec<String>,
    /// Blank lines before each footer comment
    pub footer_blank_lines: Vec<usize>,
}

impl ConfigDocument {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            footer: Vec::new(),
            footer_blank_lines: Vec::new(),
        }
    }

    /// Parse YAML text
    pub fn parse(source: &str) -> Result<Self> {
        parse::parse_document(source)
    }

    /// Read and parse a file
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| PanelError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&source)
    }

    /// Serialize to YAML text
    pub fn to_yaml_string(&self) -> String {
        emit::emit_document(self)
    }

    /// Write to `path` through a temp file so a failed write never leaves
    /// the target truncated
    pub fn save(&self, path: &Path) -> Result<()> {
        fs_utils::write_atomic(path, self.to_yaml_string().as_bytes()).map_err(|e| {
            PanelError::WriteFailure {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })
    }

    /// `{data, comments, order}` projection for the web front-end
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::from_node(&self.root)
    }
}
