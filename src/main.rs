//! eridanus-webui CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use eridanus_webui::cli::{Cli, Commands, OutputFormat};
use eridanus_webui::commands::{
    run_config, run_files, run_load, run_relay, run_save, CommandContext,
};
use eridanus_webui::{PanelConfig, PanelError};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(PanelConfig::default_path);
    let config = match PanelConfig::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => return report_error(&e, cli.format),
    };

    init_tracing(&config.logging.level, cli.verbose);

    match run(&cli, config, config_path) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e, cli.format),
    }
}

fn run(cli: &Cli, mut config: PanelConfig, config_path: std::path::PathBuf) -> eridanus_webui::Result<String> {
    if let Some(run_dir) = &cli.run_dir {
        config.paths.run_dir = run_dir.clone();
    }
    let ctx = CommandContext::new(cli.format, cli.verbose, config, config_path);

    match &cli.command {
        Commands::Files => run_files(&ctx),
        Commands::Load(args) => run_load(args, &ctx),
        Commands::Save(args) => run_save(args, &ctx),
        Commands::Relay(args) => run_relay(args, &ctx),
        Commands::Config(args) => run_config(args, &ctx),
    }
}

/// Logs go to stderr so command output on stdout stays clean.
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("eridanus_webui={}", level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report_error(err: &PanelError, format: OutputFormat) -> ExitCode {
    match format {
        OutputFormat::Json => println!("{}", err.to_payload()),
        OutputFormat::Text => eprintln!("Error: {}", err),
    }
    err.exit_code()
}
