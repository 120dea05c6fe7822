//! Command-line interface for the tic-tac-toe arena.

use clap::Parser;
use std::path::PathBuf;

/// Tic-tac-toe arena - WebSocket matchmaking and game server
#[derive(Parser, Debug)]
#[command(name = "tictactoe_arena")]
#[command(about = "Pairs WebSocket players into tic-tac-toe games", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (missing file means defaults)
    #[arg(short, long, default_value = "tictactoe.toml")]
    pub config: PathBuf,

    /// Host to bind to, overriding config and environment
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to, overriding config and environment
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Display name for game connections that arrive without one
    #[arg(long)]
    pub default_name: Option<String>,
}
