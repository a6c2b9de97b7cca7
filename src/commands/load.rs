//! Load command handler - Show a configuration file for editing

use serde_json::Value as Json;

use crate::cli::LoadArgs;
use crate::commands::{resolve_target, CommandContext};
use crate::document::DocumentSnapshot;
use crate::error::{PanelError, Result};
use crate::store::load_document;

/// Run the load command
pub fn run_load(args: &LoadArgs, ctx: &CommandContext) -> Result<String> {
    let target = resolve_target(&args.target, ctx)?;
    let snapshot = load_document(&target.path)?;

    let json_value = serde_json::to_value(&snapshot).map_err(|e| PanelError::ConfigError {
        message: format!("JSON serialization failed: {}", e),
    })?;

    ctx.render(&json_value, || {
        let mut output = String::new();
        output.push_str(&format!("file: {}\n", target.label));
        output.push_str(&format!("path: {}\n\n", target.path.display()));
        render_entries(&snapshot, &mut output);
        output
    })
}

/// One line per scalar: `path = value  # comment`
fn render_entries(snapshot: &DocumentSnapshot, output: &mut String) {
    let mut lines = Vec::new();
    flatten("", &snapshot.data, &mut lines);
    for (path, value) in lines {
        match snapshot.comments.get(&path).and_then(Json::as_str) {
            Some(comment) => {
                let comment = comment.replace('\n', " / ");
                output.push_str(&format!("{} = {}  # {}\n", path, value, comment));
            }
            None => output.push_str(&format!("{} = {}\n", path, value)),
        }
    }
}

fn flatten(path: &str, value: &Json, out: &mut Vec<(String, String)>) {
    match value {
        Json::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten(&child_path, child, out);
            }
        }
        Json::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten(&format!("{}[{}]", path, i), child, out);
            }
        }
        other => out.push((path.to_string(), other.to_string())),
    }
}
