//! CLI module for reqlog
//!
//! # Commands
//!
//! - `serve` - Start the demo server with request logging
//! - `config init` - Write an example configuration file
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! reqlog serve
//!
//! # Log only warnings and above, nested under "http"
//! reqlog serve --log-level warn
//! ```

pub mod config;
pub mod serve;

pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// reqlog - structured JSON request logging for axum
#[derive(Parser, Debug)]
#[command(
    name = "reqlog",
    version,
    about = "Demo server for structured JSON request logging"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the demo server
    Serve(ServeArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "reqlog.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Request log level (debug, info, warn, error, off)
    #[arg(short, long)]
    pub log_level: Option<crate::Lvl>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "reqlog.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}
