//! Telemetry cache CLI
//!
//! Warms the cache over an ERT range and reports cache statistics.

mod table_source;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use table_source::TableSource;
use tlmcache::TelemetryCache;
use tlmcache_common::CacheConfig;
use tlmcache_common::time::{format_utc, parse_utc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tlmcache")]
#[command(about = "Telemetry range cache tools")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "tlmcache.toml")]
    config: PathBuf,

    /// Cache file location
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// JSON-lines telemetry table used as the upstream source
    #[arg(long)]
    table: Option<PathBuf>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch an ERT range into the cache
    Precache {
        /// Range start (UTC, e.g. 2025-001T00:00:00)
        start: String,
        /// Range stop, exclusive
        stop: String,
    },
    /// Print cache statistics
    CacheStats,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = CacheConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    // CLI takes precedence
    if let Some(cache_file) = args.cache_file {
        config.cache_file_path = cache_file;
    }
    if let Some(table) = args.table {
        config.telemetry_table_path = Some(table);
    }
    let log_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // only precache reads the table
    let table = config.telemetry_table_path.clone();
    if matches!(args.command, Commands::Precache { .. }) && table.is_none() {
        anyhow::bail!("no telemetry table configured (set telemetry_table_path or pass --table)");
    }
    let source = TableSource::new(table.unwrap_or_default());
    let cache = TelemetryCache::open_with_config(source, &config)
        .with_context(|| format!("failed to open cache {}", config.cache_file_path.display()))?;

    match args.command {
        Commands::Precache { start, stop } => precache(&cache, &start, &stop),
        Commands::CacheStats => cache_stats(&cache),
    }
}

fn precache(cache: &TelemetryCache<TableSource>, start: &str, stop: &str) -> Result<()> {
    let start = parse_utc(start)?;
    let stop = parse_utc(stop)?;

    cache.connect_source()?;
    let fetched = cache.get_samples_in_range(start, stop);
    if let Err(e) = cache.disconnect_source() {
        warn!("Failed to disconnect telemetry source: {}", e);
    }

    let samples = fetched?;
    info!(
        "Cache now contains {} frame samples in [{}, {})",
        samples.len(),
        format_utc(&start),
        format_utc(&stop)
    );
    Ok(())
}

fn cache_stats(cache: &TelemetryCache<TableSource>) -> Result<()> {
    info!("Statistics for cache file {}", cache.path().display());
    for (key, value) in cache.get_cache_statistics()? {
        info!("{}: {}", key, value);
    }
    Ok(())
}
