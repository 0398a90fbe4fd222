//! # Review Rater CLI (`rater`)
//!
//! ## Usage
//!
//! ```bash
//! rater --config ./config/rater.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rater init` | Create the SQLite database and the `reviews` table |
//! | `rater serve` | Load the model and start the HTTP API |
//! | `rater predict "<text>"` | Predict a rating for one review |
//! | `rater normalize ["<text>"]` | Print normalized text (stdin, one review per line, if no text) |
//! | `rater history` | Print saved predictions |
//!
//! Log verbosity is controlled with `RUST_LOG` (default
//! `review_rater=info,tower_http=info`). Logs go to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use review_rater::{config, history, migrate, normalize, predict, server};

/// Review Rater: serve a pre-trained review rating classifier.
#[derive(Parser)]
#[command(
    name = "rater",
    about = "Review Rater: serve a pre-trained review rating classifier over HTTP",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Model artifact paths, the label mapping convention, the database
    /// path and the bind address are all read from this file.
    #[arg(
        long,
        global = true,
        env = "RATER_CONFIG",
        default_value = "./config/rater.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the history database.
    ///
    /// Creates the SQLite file and the `reviews` table. Safe to run
    /// repeatedly.
    Init,

    /// Start the HTTP server.
    ///
    /// Loads the encoder and classifier, opens the history database and
    /// binds to `[server].bind`.
    Serve,

    /// Predict a rating for a single review.
    Predict {
        /// Review text.
        text: String,

        /// Also print the normalized text, raw label and mapping.
        #[arg(long)]
        explain: bool,
    },

    /// Print the normalized form of review text.
    ///
    /// With no argument, reads reviews from stdin one per line and writes one
    /// normalized line per input line. Use this to preprocess training data
    /// with the exact transform the server applies.
    Normalize {
        /// Review text. Reads stdin when omitted.
        text: Option<String>,
    },

    /// List saved predictions.
    History {
        /// Print as JSON in the same shape as `GET /history`.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("review_rater=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_normalize(text: Option<String>) -> Result<()> {
    match text {
        Some(text) => println!("{}", normalize::normalize_str(&text)),
        None => {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                println!("{}", normalize::normalize_str(&line?));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Normalize { text } = &cli.command {
        return run_normalize(text.clone());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Predict { text, explain } => {
            predict::run_predict(&cfg, &text, explain)?;
        }
        Commands::History { json } => {
            history::run_history(&cfg, json).await?;
        }
        Commands::Normalize { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
