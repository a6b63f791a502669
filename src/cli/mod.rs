//! Command-line interface for the FonoKids backend.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// FonoKids patient backend
/// Accounts, password recovery and profiles for the FonoKids therapy app
#[derive(Parser)]
#[command(name = "fonokids")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a config file (skips the default search paths)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Write a default config.toml to the working directory
    #[command(alias = "--init")]
    Init,
}

impl Cli {
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}
