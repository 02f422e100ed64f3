//! RegSweep CLI - retention planning for registry image tags.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use regsweep_cli::config::Config;
use regsweep_cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    let filter = if cli.debug {
        "regsweep_core=debug,regsweep_registry=debug,regsweep_cli=debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args, &config, cli.format).await,
        Commands::Apply(args) => commands::apply::execute(args, &config, cli.format).await,
        Commands::Version => commands::version::execute(),
    }
}
