//! # Access Scan CLI (`ascan`)
//!
//! ## Usage
//!
//! ```bash
//! ascan --config ./config/ascan.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ascan init` | Create the SQLite database and run schema migrations |
//! | `ascan serve` | Start the HTTP API |
//! | `ascan scan <file>` | Analyze a PDF, DOCX, PPTX, or image |
//! | `ascan scan-url <url>` | Analyze a live website |
//! | `ascan history` | List analyses, newest first |
//! | `ascan report <id>` | Show a completed analysis |
//! | `ascan delete <id>` | Delete an analysis |
//!
//! Logging is controlled with `RUST_LOG` (default `access_scan=info`).

use access_scan::{commands, config, migrate, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Access Scan CLI: accessibility and ATS analysis for documents and websites.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ascan.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ascan",
    about = "Access Scan: accessibility and ATS analysis for documents and websites",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ascan.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Analyze a local document or image.
    Scan {
        /// File to analyze (pdf, docx, pptx, jpg, jpeg, png).
        file: PathBuf,

        /// Owner the analysis is recorded under.
        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// Analyze a live website in a headless browser.
    ScanUrl {
        /// URL starting with http:// or https://.
        url: String,

        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// List analyses, newest first.
    History {
        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// Show the full report of a completed analysis.
    ///
    /// Exits with status 1 if the analysis does not exist or is not completed.
    Report {
        id: String,

        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// Delete an analysis and any stored artifact.
    Delete {
        id: String,

        #[arg(long, default_value = "local")]
        owner: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("access_scan=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Scan { file, owner } => {
            commands::run_scan(&cfg, &file, &owner).await?;
        }
        Commands::ScanUrl { url, owner } => {
            commands::run_scan_url(&cfg, &url, &owner).await?;
        }
        Commands::History { owner } => {
            commands::run_history(&cfg, &owner).await?;
        }
        Commands::Report { id, owner } => {
            commands::run_report(&cfg, &id, &owner).await?;
        }
        Commands::Delete { id, owner } => {
            commands::run_delete(&cfg, &id, &owner).await?;
        }
    }

    Ok(())
}
