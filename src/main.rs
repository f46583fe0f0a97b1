//! CSE Trade Summary Scraper
//!
//! `run` performs a single invocation and prints the JSON result.
//! `serve` exposes the same invocation behind an HTTP trigger.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cse_trade_scraper::{server, Config, HttpClient, S3Helper, ScrapeError, ScrapeResponse, Scraper};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "cse-trade-scraper")]
#[command(about = "Scrape the CSE trade summary and upload it as CSV", long_about = None)]
struct Args {
    /// Optional YAML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Destination bucket
    #[arg(long, env = "BUCKET_NAME", global = true)]
    bucket: Option<String>,

    /// Object store provider: gcs, aws, r2, b2 or generic
    #[arg(long, env = "STORAGE_PROVIDER", global = true)]
    provider: Option<String>,

    /// Custom S3-compatible endpoint URL
    #[arg(long, env = "STORAGE_ENDPOINT", global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape once and print the JSON result
    Run,
    /// Serve the HTTP trigger
    Serve {
        /// Server port
        #[arg(short, long, env = "PORT", default_value = "8080")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    match execute(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: Args) -> Result<ExitCode> {
    let config = load_config(&args)?;

    match args.command {
        Command::Run => {
            let has_bucket = config.bucket().is_some();
            let (response, _status) = match build_scraper(config).await {
                Ok(scraper) => scraper.invoke().await,
                Err(e) => {
                    let err = startup_error(has_bucket, e);
                    error!("Scrape failed ({}): {}", err.kind(), err);
                    ScrapeResponse::from_result(&Err(err))
                }
            };

            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("Failed to serialize response")?
            );

            Ok(if response.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Serve { port } => {
            let scraper = build_scraper(config).await?;
            server::serve(Arc::new(scraper), port).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Config file (or defaults) overlaid with CLI/environment values
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Config::from_file(path).context("Failed to load configuration")?
        }
        None => Config::default(),
    };

    config = config.with_bucket(args.bucket.clone());
    if let Some(provider) = &args.provider {
        config.storage.provider = provider.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.storage.endpoint = Some(endpoint.clone());
    }

    Ok(config)
}

/// A missing bucket outranks whatever broke while building the clients
fn startup_error(has_bucket: bool, err: anyhow::Error) -> ScrapeError {
    if has_bucket {
        ScrapeError::Unknown(err)
    } else {
        ScrapeError::missing_bucket()
    }
}

async fn build_scraper(config: Config) -> Result<Scraper> {
    let transport = HttpClient::new(config.api.proxy.as_deref())?;
    let store = S3Helper::new(&config.storage).await?;

    Ok(Scraper::new(config, Arc::new(transport), Arc::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cse_trade_scraper::StorageConfig;

    #[tokio::test]
    async fn test_missing_bucket_wins_over_store_setup_failure() {
        let config = Config {
            storage: StorageConfig {
                provider: "r2".to_string(),
                ..StorageConfig::default()
            },
            ..Config::default()
        };
        let has_bucket = config.bucket().is_some();
        let setup = build_scraper(config).await.err().unwrap();

        let err = startup_error(has_bucket, setup);
        assert!(matches!(err, ScrapeError::Config(_)));
        assert_eq!(
            ScrapeResponse::failure(&err).message,
            "BUCKET_NAME environment variable not set."
        );
    }

    #[test]
    fn test_store_setup_failure_with_bucket_is_unknown() {
        let err = startup_error(true, anyhow::anyhow!("Cloudflare R2 requires an endpoint URL"));
        assert!(matches!(err, ScrapeError::Unknown(_)));
    }
}
