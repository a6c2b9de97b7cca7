//! JSON projection of a document for the browser editor
//!
//! The editor receives `{data, comments, order}`: the plain value tree plus
//! two path-keyed views derived from the node tree on demand. Edited data
//! comes back as plain JSON and is turned into an unstyled node tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as Json};

use super::{index_path, key_path, Mapping, Node, Value};

/// `{data, comments, order}` as served by `loadDocument`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub data: Json,
    pub comments: Map<String, Json>,
    pub order: Map<String, Json>,
}

impl DocumentSnapshot {
    pub fn from_node(root: &Node) -> Self {
        let mut comments = Map::new();
        collect_comments(root, "", &mut comments);
        let mut order = Map::new();
        collect_order(root, "", &mut order);
        Self {
            data: to_json(root),
            comments,
            order,
        }
    }
}

/// Plain JSON value of a node tree
pub fn to_json(node: &Node) -> Json {
    match &node.value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Str(s) => Json::String(s.clone()),
        Value::Seq(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.to_string(), to_json(v)))
                .collect(),
        ),
    }
}

/// Node tree for incoming JSON. Every node is plain with no comments.
pub fn from_json(value: &Json) -> Node {
    let value = match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => Value::Seq(items.iter().map(from_json).collect()),
        Json::Object(obj) => Value::Map(
            obj.iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect::<Mapping>(),
        ),
    };
    Node::new(value)
}

/// The comment shown for a node: its trailing comment, or failing that
/// the comment block directly above it
fn display_comment(node: &Node) -> Option<String> {
    match &node.comment {
        Some(c) if !c.is_empty() => Some(c.clone()),
        _ if !node.leading.is_empty() => Some(node.leading.join("\n")),
        _ => None,
    }
}

fn collect_comments(node: &Node, path: &str, out: &mut Map<String, Json>) {
    if !path.is_empty() {
        if let Some(comment) = display_comment(node) {
            out.insert(path.to_string(), Json::String(comment));
        }
    }
    match &node.value {
        Value::Map(map) => {
            for (key, child) in map.iter() {
                collect_comments(child, &key_path(path, key), out);
            }
        }
        Value::Seq(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_comments(child, &index_path(path, i), out);
            }
        }
        _ => {}
    }
}

fn collect_order(node: &Node, path: &str, out: &mut Map<String, Json>) {
    match &node.value {
        Value::Map(map) => {
            out.insert(
                path.to_string(),
                Json::Array(map.keys().map(|k| Json::String(k.to_string())).collect()),
            );
            for (key, child) in map.iter() {
                collect_order(child, &key_path(path, key), out);
            }
        }
        Value::Seq(items) => {
            out.insert(path.to_string(), Json::from(items.len()));
            for (i, child) in items.iter().enumerate() {
                collect_order(child, &index_path(path, i), out);
            }
        }
        _ => {}
    }
}
