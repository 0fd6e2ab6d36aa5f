//! Hyperdata CLI
//!
//! Offline tools for desired-state documents.
//!
//! # Commands
//!
//! - `plan` - Show what a collection sync would create, update and delete
//! - `uri-list` - Show the additions and removals for an identifier list
//! - `inspect` - Summarize a representation's links, attributes and children

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Hyperdata command-line tools.
#[derive(Parser)]
#[command(name = "hyperdata")]
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
    /// Show what a collection sync would do
    Plan {
        /// Existing collection (JSON representation with items)
        existing: PathBuf,

        /// Desired collection document (JSON)
        desired: PathBuf,

        /// Comparator attributes tried after link identity
        #[arg(short, long, value_delimiter = ',', default_value = "name,title")]
        match_on: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Diff two text/uri-list files
    UriList {
        /// Existing list
        existing: PathBuf,

        /// Desired list
        desired: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Summarize a representation
    Inspect {
        /// JSON representation
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Plan {
            existing,
            desired,
            match_on,
            format,
        } => {
            commands::plan::run(&existing, &desired, &match_on, &format)?;
        }
        Commands::UriList {
            existing,
            desired,
            format,
        } => {
            commands::uri_list::run(&existing, &desired, &format)?;
        }
        Commands::Inspect { path, format } => {
            commands::inspect::run(&path, &format)?;
        }
        Commands::Version => {
            println!("Hyperdata CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
