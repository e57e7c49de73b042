// ABOUTME: Entry point for the fleetup CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use fleetup::config;
use fleetup::error::Result;
use fleetup::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    let result = run(cli, Output::new(mode)).await;

    if let Err(e) = result {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;
    match cli.command {
        Commands::Init { force } => {
            config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Plan => commands::plan(&cwd, output).await,
        Commands::Apply {
            contract,
            core,
            bootstrap,
            control_plane,
            infrastructure,
        } => {
            let target = match contract {
                Some(contract) => commands::ApplyTarget::Contract(contract),
                None => commands::ApplyTarget::Providers(commands::ProviderArgs {
                    core,
                    bootstrap,
                    control_plane,
                    infrastructure,
                }),
            };
            commands::apply(&cwd, target, output).await
        }
    }
}
