//! Relay command handler
//!
//! Runs the chat relay until interrupted (Ctrl-C).

use anyhow::Context;

use crate::cli::RelayArgs;
use crate::commands::CommandContext;
use crate::error::{PanelError, Result};
use crate::config::RelayConfig;
use crate::relay;

/// Run the relay server
///
/// This creates a tokio runtime and blocks on the accept loop.
pub fn run_relay(args: &RelayArgs, ctx: &CommandContext) -> Result<String> {
    let mut config = ctx.config.relay.clone();
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let runtime = tokio::runtime::Runtime::new().map_err(|e| PanelError::RelayFailure {
        message: format!("Failed to create tokio runtime: {}", e),
    })?;

    runtime
        .block_on(serve_until_interrupted(&config))
        .map_err(|e| PanelError::RelayFailure {
            message: format!("{:#}", e),
        })?;

    Ok(String::new())
}

async fn serve_until_interrupted(config: &RelayConfig) -> anyhow::Result<()> {
    let (listener, hub) = relay::bind(config)
        .await
        .with_context(|| format!("failed to bind relay on {}:{}", config.host, config.port))?;
    tracing::info!(
        self_id = config.identity.self_id,
        group_id = config.identity.group_id,
        "starting relay v{}",
        env!("CARGO_PKG_VERSION")
    );

    tokio::select! {
        result = relay::serve(listener, hub) => {
            result.context("relay accept loop failed")
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down relay");
            Ok(())
        }
    }
}
