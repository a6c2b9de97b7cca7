//! Config command handler - Show and edit the panel configuration

use crate::cli::{ConfigArgs, ConfigOperation};
use crate::commands::CommandContext;
use crate::config::PanelConfig;
use crate::error::{PanelError, Result};

/// Run the config command
pub fn run_config(args: &ConfigArgs, ctx: &CommandContext) -> Result<String> {
    match &args.operation {
        ConfigOperation::Show => {
            let json_value = serde_json::to_value(&ctx.config).map_err(|e| PanelError::ConfigError {
                message: format!("JSON serialization failed: {}", e),
            })?;
            ctx.render(&json_value, || ctx.config.display())
        }
        ConfigOperation::Get { key } => {
            let value = ctx.config.get(key).ok_or_else(|| PanelError::ConfigError {
                message: format!("Unknown configuration key: {}", key),
            })?;
            let json_value = serde_json::json!({ "key": key, "value": value });
            ctx.render(&json_value, || format!("{}\n", value))
        }
        ConfigOperation::Set { key, value } => {
            let mut config = PanelConfig::load_from(&ctx.config_path)?;
            config.set(key, value)?;
            config.save_to(&ctx.config_path)?;
            let json_value = serde_json::json!({ "key": key, "value": value, "saved": true });
            ctx.render(&json_value, || format!("Set {} = {}\n", key, value))
        }
        ConfigOperation::Reset => {
            let mut config = PanelConfig::load_from(&ctx.config_path)?;
            config.reset();
            config.save_to(&ctx.config_path)?;
            let json_value = serde_json::json!({ "reset": true });
            ctx.render(&json_value, || "Configuration reset to defaults\n".to_string())
        }
        ConfigOperation::Path => {
            let path = ctx.config_path.display().to_string();
            let json_value = serde_json::json!({ "path": path });
            ctx.render(&json_value, || format!("{}\n", path))
        }
    }
}
