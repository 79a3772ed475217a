use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiercrawl::config::{CacheBackend, Config};
use tiercrawl::crawler::{ExistenceProber, ReachabilityCheck};
use tiercrawl::models::Tier;
use tiercrawl::server::CrawlServer;
use tiercrawl::service::CrawlService;

#[derive(Parser)]
#[command(
    name = "tiercrawl",
    version,
    about = "Tiered crawl-request orchestrator with admission quotas and a cache-aside page store",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP crawl server
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check whether a URL answers a HEAD request
    Probe {
        /// URL to probe
        url: String,

        /// Number of attempts
        #[arg(long)]
        retries: Option<u32>,

        /// Delay after each failed attempt, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Crawl a single URL and print the result as JSON
    Crawl {
        /// URL to crawl
        url: String,

        /// Customer tier indicator (only "Paid" selects the paid tier)
        #[arg(short, long, default_value = "Free")]
        tier: String,

        /// Override the maximum link depth
        #[arg(short, long)]
        depth: Option<usize>,

        /// Collect paragraph and heading text
        #[arg(long, default_value = "false")]
        text: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = tiercrawl::metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.bind_address.set_port(port);
            }
            serve(config).await?;
        }

        Commands::Probe {
            url,
            retries,
            interval_ms,
        } => {
            if let Some(retries) = retries {
                config.probe.max_retries = retries;
            }
            if let Some(ms) = interval_ms {
                config.probe.retry_interval_ms = ms;
            }
            probe(&config, &url).await?;
        }

        Commands::Crawl {
            url,
            tier,
            depth,
            text,
        } => {
            if let Some(depth) = depth {
                config.fetch.max_depth = depth;
            }
            config.fetch.extract_text |= text;
            // One-shot runs do not need a shared store
            config.cache.backend = CacheBackend::Memory;
            crawl(&config, &url, Tier::from_indicator(Some(&tier))).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("tiercrawl=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("tiercrawl={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let server = CrawlServer::from_config(&config).await?;

    println!("{}", server.info().display());
    println!();

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("Crawl server stopped.");
    Ok(())
}

async fn probe(config: &Config, url: &str) -> Result<()> {
    let prober = ExistenceProber::from_config(&config.probe)?;

    tracing::info!(
        url,
        retries = config.probe.max_retries,
        interval = ?Duration::from_millis(config.probe.retry_interval_ms),
        "Probing URL"
    );

    match prober.probe(url).await {
        Ok(true) => println!("{url}: reachable"),
        Ok(false) => println!("{url}: not found"),
        Err(e) => println!("{url}: unreachable ({e})"),
    }

    Ok(())
}

async fn crawl(config: &Config, url: &str, tier: Tier) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let service = CrawlService::from_config(config).await?;
    let data = service
        .crawl(url, tier)
        .await
        .with_context(|| format!("Crawl of {url} failed"))?;

    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
