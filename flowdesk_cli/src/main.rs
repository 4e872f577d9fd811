use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;
use flowdesk_core::lifecycle::LifecycleAction;

/// Core events use `flowdesk.<component>` targets, so `flowdesk` covers them
/// and the more specific `flowdesk_cli` directive wins for this crate.
fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "flowdesk=warn,flowdesk_cli=info",
        1 => "flowdesk=debug,flowdesk_cli=debug",
        _ => "flowdesk=trace,flowdesk_cli=trace",
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Show { connector } => show::run(&cli, connector).await,
        Commands::Set {
            connector,
            assignments,
        } => edit::run_set(&cli, connector, assignments).await,
        Commands::Rows { action } => edit::run_rows(&cli, action.clone()).await,
        Commands::Validate { connector } => lifecycle::validate(&cli, connector).await,
        Commands::Start { connector } => {
            lifecycle::trigger(&cli, connector, LifecycleAction::Start).await
        }
        Commands::Stop { connector } => {
            lifecycle::trigger(&cli, connector, LifecycleAction::Stop).await
        }
        Commands::Delete { connector } => lifecycle::delete(&cli, connector).await,
        Commands::Config { action } => config::run(&cli, action.clone()).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
