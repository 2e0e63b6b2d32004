//! # Face Scan Configuration Validator
//!
//! Command-line tool for validating face scan configuration before starting
//! the service. Loads the same file and environment overrides the service
//! would, runs validation, and optionally checks database connectivity.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use face_scan_core::config::{ConfigManager, FaceScanConfig};
use face_scan_core::database::DatabaseConnection;
use face_scan_core::recognition::HttpRecognitionClient;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate face scan configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (default: config/face-scan.yaml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate all configuration sections
    All,

    /// Validate a single section
    Component {
        /// Section name (database, recognition, blob_storage, orchestration)
        name: String,
    },

    /// Print the effective configuration with secrets masked
    Show,

    /// Connect to the configured database and run a health check
    CheckDatabase,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = run(&cli).await;

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {e:#}");
            eprintln!("Configuration validation failed: {e:#}");
            process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let manager = ConfigManager::load_from_path(cli.config.as_deref())
        .context("failed to load configuration")?;

    println!("Environment: {}", manager.environment());
    if let Some(path) = manager.config_path() {
        println!("Config File: {}", path.display());
    }
    println!();

    match &cli.command {
        Some(Commands::All) | None => validate_all(manager.config()),
        Some(Commands::Component { name }) => validate_component(manager.config(), name),
        Some(Commands::Show) => {
            println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
            Ok(())
        }
        Some(Commands::CheckDatabase) => check_database(manager.config()).await,
    }
}

fn validate_all(config: &FaceScanConfig) -> anyhow::Result<()> {
    validate_database(config);
    validate_recognition(config)?;
    validate_blob_storage(config);
    validate_orchestration(config);

    println!("\nAll configuration validation checks passed!");
    Ok(())
}

fn validate_component(config: &FaceScanConfig, name: &str) -> anyhow::Result<()> {
    match name.to_lowercase().as_str() {
        "database" => validate_database(config),
        "recognition" => validate_recognition(config)?,
        "blob_storage" | "blob-storage" => validate_blob_storage(config),
        "orchestration" => validate_orchestration(config),
        _ => bail!("Unknown component: {name}"),
    }

    println!("Component '{name}' validation passed!");
    Ok(())
}

fn validate_database(config: &FaceScanConfig) {
    println!("Database:");
    println!("   max_connections: {}", config.database.max_connections);
    println!(
        "   acquire_timeout: {}s",
        config.database.acquire_timeout_seconds
    );
}

fn validate_recognition(config: &FaceScanConfig) -> anyhow::Result<()> {
    println!("Recognition:");

    let endpoint = HttpRecognitionClient::build_endpoint(&config.recognition.url)
        .context("recognition endpoint is not usable")?;
    println!("   endpoint: {endpoint}");
    println!(
        "   rate limit: {}/s, burst {}",
        config.recognition.requests_per_second, config.recognition.burst
    );

    if config.recognition.authorization.is_empty() {
        println!("   authorization header not configured; provider calls will be rejected");
    }

    Ok(())
}

fn validate_blob_storage(config: &FaceScanConfig) {
    println!("Blob storage:");
    println!(
        "   files: {}/<image_uuid>.{}",
        config.blob_storage.root_dir.display(),
        config.blob_storage.file_extension
    );
}

fn validate_orchestration(config: &FaceScanConfig) {
    println!("Orchestration:");
    println!("   detach_runs: {}", config.orchestration.detach_runs);
}

async fn check_database(config: &FaceScanConfig) -> anyhow::Result<()> {
    let connection = DatabaseConnection::new(&config.database)
        .await
        .context("failed to connect to database")?;

    if !connection.health_check().await? {
        bail!("database health check returned an unexpected value");
    }

    println!("Database connection healthy");
    connection.close().await;
    Ok(())
}
