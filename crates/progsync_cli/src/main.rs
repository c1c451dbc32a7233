//! progsync CLI
//!
//! Runs the sync server and a few tools around it.
//!
//! # Commands
//!
//! - `serve` - Run the HTTP sync server
//! - `show` - Print an owner's document as the server holds it
//! - `token` - Issue a bearer token for an owner
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// progsync sync server and tools.
#[derive(Parser)]
#[command(name = "progsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP sync server
    Serve(commands::serve::ServeArgs),

    /// Print an owner's document as the server holds it
    Show(commands::show::ShowArgs),

    /// Issue a bearer token for an owner
    Token(commands::token::TokenArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await?,
        Commands::Show(args) => commands::show::run(args).await?,
        Commands::Token(args) => commands::token::run(&args)?,
        Commands::Version => {
            println!("progsync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
