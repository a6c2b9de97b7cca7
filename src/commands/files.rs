//! Files command handler - List editable configuration files

use crate::commands::CommandContext;
use crate::error::Result;

/// Run the files command
pub fn run_files(ctx: &CommandContext) -> Result<String> {
    let store = ctx.document_store();
    let files = store.files();

    let json_value = serde_json::json!({
        "_type": "files",
        "run_dir": store.index().run_dir().display().to_string(),
        "count": files.len(),
        "files": files,
    });

    ctx.render(&json_value, || {
        let mut output = String::new();
        output.push_str(&format!("run_dir: {}\n", store.index().run_dir().display()));
        output.push_str(&format!("files: {}\n", files.len()));
        if files.is_empty() {
            output.push_str("\nNo plugin configuration files found.\n");
            return output;
        }
        output.push('\n');
        let width = files.iter().map(|f| f.name.chars().count()).max().unwrap_or(0);
        for file in &files {
            let pad = width - file.name.chars().count();
            output.push_str(&format!(
                "  {}{}  {}\n",
                file.name,
                " ".repeat(pad),
                file.path.display()
            ));
        }
        output
    })
}
