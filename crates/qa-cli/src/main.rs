//! qrasset CLI
//!
//! Command-line interface for the QR asset service.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;

use commands::{run_migrate, run_server, ServeOverrides};
use config::AppConfig;
use qa_observability::{init_logging_with_config, LoggingConfig};

#[derive(Parser)]
#[command(name = "qrasset")]
#[command(version)]
#[command(about = "Fixed asset register with QR labels, photos and an audit trail", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "QRASSET_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Database URL (sqlite: or postgres://)
        #[arg(short, long, env = "DATABASE_URL")]
        database: Option<String>,

        /// Disable Swagger UI
        #[arg(long)]
        no_swagger: bool,

        /// Directory uploaded files are written to
        #[arg(long, value_name = "DIR")]
        storage_root: Option<PathBuf>,

        /// URL prefix stored files are served from
        #[arg(long, value_name = "URL")]
        public_url: Option<String>,
    },

    /// Apply database migrations and exit
    Migrate {
        /// Database URL (sqlite: or postgres://)
        #[arg(short, long, env = "DATABASE_URL")]
        database: Option<String>,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config/qrasset.yaml"));
    let (mut config, loaded) = match AppConfig::load(&config_path) {
        Ok(config) => (config, true),
        Err(_) if cli.config.is_none() => (AppConfig::default(), false),
        Err(e) => return Err(e),
    };

    let mut logging = LoggingConfig::default()
        .with_level_name(&config.logging.level)
        .with_format(config.logging.format);
    if cli.verbose {
        logging.level = tracing::Level::DEBUG;
    }
    init_logging_with_config(logging);

    if !loaded && cli.verbose {
        eprintln!("Using default configuration (no config file found)");
    }

    match cli.command {
        Commands::Serve {
            port,
            host,
            database,
            no_swagger,
            storage_root,
            public_url,
        } => {
            ServeOverrides {
                port,
                host,
                database_url: database,
                no_swagger,
                storage_root,
                public_url,
            }
            .apply(&mut config);
            run_server(config).await
        }
        Commands::Migrate { database } => {
            let url = database.unwrap_or(config.database.url);
            println!("{}", "Running migrations...".cyan());
            run_migrate(&url).await
        }
        Commands::Config { show_secrets } => cmd_config(config, show_secrets),
    }
}

fn cmd_config(config: AppConfig, show_secrets: bool) -> Result<()> {
    let display_config = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };

    println!("{}", "Current Configuration".bold());
    println!("─────────────────────────");
    let yaml = serde_yaml::to_string(&display_config).context("Failed to render configuration")?;
    print!("{}", yaml);
    Ok(())
}
