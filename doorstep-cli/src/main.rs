//! Doorstep CLI - spot-check entrance resolution from the terminal.
//!
//! The commands hit the live public services, with the engine's
//! courtesy rate limits and caching applied.

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;

#[derive(Parser)]
#[command(name = "doorstep")]
#[command(author, version, about = "Find building entrances from public map data", long_about = None)]
struct Cli {
    /// Enable verbose engine logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the most plausible pedestrian entrance for a place query
    Resolve {
        /// Address or place query
        #[arg(value_name = "QUERY")]
        query: String,

        /// Bias the search toward a coordinate
        #[arg(long, value_name = "LAT,LON")]
        near: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// List ranked geocoder candidates for a query
    Suggest {
        /// Address or place query, possibly incomplete
        #[arg(value_name = "QUERY")]
        query: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("doorstep_core=debug,doorstep_cli=debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Resolve { query, near, json } => {
            commands::resolve::execute(query, near, json).await
        }
        Commands::Suggest { query, json } => commands::suggest::execute(query, json).await,
    };

    if let Err(err) = result {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(exit_codes::for_error(&err));
    }
}
