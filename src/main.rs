//! poststage command-line interface.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use poststage::config::{Config, LogFormat};
use poststage::constants::DEFAULT_CONFIG_FILE;

mod commands;

#[derive(Parser)]
#[command(name = "poststage")]
#[command(about = "Short-lived staging for blog posts", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (and the sweep schedule, if enabled)
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Delete every expired post now
    Sweep,
    /// List stored posts, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print one post
    Show {
        /// Post id
        id: String,
    },
    /// Mark a post published and extend its expiry
    Complete {
        /// Post id
        id: String,
    },
    /// Delete a post and its images
    Delete {
        /// Post id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Commands::Serve { port: Some(port) } = &cli.command {
        config.server.port = *port;
    }

    init_logging(config.logging.format);

    let validation = config.validate()?;
    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Commands::Serve { .. } => commands::serve::execute(&config).await,
        Commands::Sweep => commands::sweep::execute(&config).await,
        Commands::List { json } => commands::posts::list(&config, json).await,
        Commands::Show { id } => commands::posts::show(&config, &id).await,
        Commands::Complete { id } => commands::posts::complete(&config, &id).await,
        Commands::Delete { id } => commands::posts::delete(&config, &id).await,
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging(format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
