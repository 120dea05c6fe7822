//! Tic-tac-toe arena server binary.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tictactoe_server::ServerConfig;
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    initialize_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    info!(bind = %config.bind_address(), "Starting tic-tac-toe server");
    tictactoe_server::serve(&config).await?;
    Ok(())
}

/// Config file, then environment, then command-line flags.
#[instrument(skip(cli), fields(config_path = %cli.config.display()))]
fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = ServerConfig::load(&cli.config)?;
    if let Some(host) = &cli.host {
        info!(%host, "Host overridden from command line");
        config = config.with_host(host.clone());
    }
    if let Some(port) = cli.port {
        info!(port, "Port overridden from command line");
        config = config.with_port(port);
    }
    if let Some(name) = &cli.default_name {
        info!(%name, "Default name overridden from command line");
        config = config.with_default_name(name.clone());
    }
    Ok(config)
}

fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tictactoe_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
