//! Save command handler - Reconcile edited values into a configuration file

use std::fs;
use std::io::Read;
use std::path::Path;

use serde_json::Value as Json;

use crate::cli::SaveArgs;
use crate::commands::{resolve_target, CommandContext};
use crate::error::{PanelError, Result};
use crate::reconcile::{ReconcileReport, Resolution};
use crate::store::{merge_document, save_document};

/// Run the save command
pub fn run_save(args: &SaveArgs, ctx: &CommandContext) -> Result<String> {
    let target = resolve_target(&args.target, ctx)?;
    let incoming = read_incoming(args.input.as_deref())?;

    if args.dry_run {
        let (merged, report) = merge_document(&target.path, &incoming)?;
        let yaml = merged.to_yaml_string();
        let json_value = serde_json::json!({
            "_type": "save_preview",
            "file": target.label,
            "path": target.path.display().to_string(),
            "yaml": yaml,
            "report": report,
        });
        return ctx.render(&json_value, || {
            let mut output = yaml.clone();
            if ctx.verbose {
                output.push('\n');
                render_report(&report, &mut output);
            }
            output
        });
    }

    let report = save_document(&target.path, &incoming)?;
    let json_value = serde_json::json!({
        "_type": "save",
        "file": target.label,
        "path": target.path.display().to_string(),
        "saved": true,
        "report": report,
    });
    ctx.render(&json_value, || {
        let mut output = format!("saved: {}\n", target.label);
        render_report(&report, &mut output);
        output
    })
}

fn read_incoming(input: Option<&Path>) -> Result<Json> {
    let text = match input {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).map_err(|e| PanelError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        }
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    serde_json::from_str(&text).map_err(|e| PanelError::ParseFailure {
        message: format!("edited values are not valid JSON: {}", e),
    })
}

fn render_report(report: &ReconcileReport, output: &mut String) {
    output.push_str(&format!("updated: {}\n", report.updated));
    output.push_str(&format!("appended: {}\n", report.appended));
    if !report.dropped.is_empty() {
        output.push_str(&format!("dropped: {}\n", report.dropped.join(", ")));
    }
    if report.has_conflicts() {
        output.push_str("conflicts:\n");
        for conflict in &report.conflicts {
            let outcome = match conflict.resolution {
                Resolution::CoercedToString => "coerced to str",
                Resolution::CoercedToInt => "coerced to int",
                Resolution::KeptNew => "kept stored value",
            };
            output.push_str(&format!(
                "  - {}: {} -> {} ({})\n",
                conflict.path, conflict.old_kind, conflict.new_kind, outcome
            ));
        }
    }
}
